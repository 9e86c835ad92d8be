use axum::{
    Router,
    routing::{get, put},
};

pub mod members;
pub mod records;
pub mod subscriptions;
pub mod system;

/// Router for all identity-aware endpoints.
pub fn router() -> Router {
    Router::new()
        .route(
            "/containers/:container_id/records",
            get(records::list_records).post(records::create_record),
        )
        .route(
            "/containers/:container_id/members/:identity_id",
            put(members::grant_membership),
        )
        .route("/subscriptions/:name", get(subscriptions::subscribe))
}
