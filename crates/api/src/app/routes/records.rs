use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, Query, rejection::QueryRejection},
    http::StatusCode,
    response::IntoResponse,
};

use feedline_core::NewRecord;
use feedline_infra::WindowSpec;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::IdentityContext;

/// GET /containers/:container_id/records?first&after&last&before
///
/// One page of the container's feed, newest first. Requires membership.
pub async fn list_records(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<IdentityContext>,
    Path(container_id): Path<String>,
    query: Result<Query<dto::ListRecordsQuery>, QueryRejection>,
) -> axum::response::Response {
    let container_id = match dto::parse_container_id(&container_id) {
        Ok(v) => v,
        Err(e) => return errors::feed_error_to_response(e),
    };
    let Query(query) = match query {
        Ok(q) => q,
        Err(rejection) => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "invalid_request",
                rejection.body_text(),
            );
        }
    };

    if let Err(e) = services.authorize(ctx.identity(), container_id).await {
        return errors::feed_error_to_response(e);
    }

    let spec = WindowSpec::from(query);
    match services.list_records(container_id, &spec).await {
        Ok(view) => Json(view).into_response(),
        Err(e) => errors::feed_error_to_response(e),
    }
}

/// POST /containers/:container_id/records
///
/// Appends a record authored by the caller and publishes it to live subscribers.
pub async fn create_record(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<IdentityContext>,
    Path(container_id): Path<String>,
    Json(body): Json<dto::CreateRecordRequest>,
) -> axum::response::Response {
    let container_id = match dto::parse_container_id(&container_id) {
        Ok(v) => v,
        Err(e) => return errors::feed_error_to_response(e),
    };
    let author = match ctx.require() {
        Ok(identity) => identity.id(),
        Err(e) => return errors::feed_error_to_response(e),
    };

    if let Err(e) = services.authorize(ctx.identity(), container_id).await {
        return errors::feed_error_to_response(e);
    }

    match services
        .append_record(NewRecord::new(container_id, author, body.payload))
        .await
    {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(e) => errors::feed_error_to_response(e),
    }
}
