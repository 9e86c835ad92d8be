use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

/// PUT /containers/:container_id/members/:identity_id
///
/// Development helper: grants membership in the in-memory directory. Real
/// deployments source memberships from their own directory service.
pub async fn grant_membership(
    Extension(services): Extension<Arc<AppServices>>,
    Path((container_id, identity_id)): Path<(String, String)>,
) -> axum::response::Response {
    let container_id = match dto::parse_container_id(&container_id) {
        Ok(v) => v,
        Err(e) => return errors::feed_error_to_response(e),
    };
    let identity_id = match dto::parse_identity_id(&identity_id) {
        Ok(v) => v,
        Err(e) => return errors::feed_error_to_response(e),
    };

    services.grant_membership(container_id, identity_id);
    StatusCode::NO_CONTENT.into_response()
}
