//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: record store, bus, membership directory, resolver, subscription router
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request DTOs and query parsing helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use feedline_infra::FeedConfig;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: &FeedConfig) -> anyhow::Result<Router> {
    let services = AppServices::from_config(config).await?;
    Ok(build_app_with(Arc::new(services)))
}

/// Build the router around already wired services.
pub fn build_app_with(services: Arc<AppServices>) -> Router {
    let feed = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn(middleware::identity_middleware));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(feed)
        .layer(ServiceBuilder::new())
}
