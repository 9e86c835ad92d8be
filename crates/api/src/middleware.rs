use axum::{http::HeaderMap, middleware::Next, response::Response};

use feedline_auth::Identity;
use feedline_core::IdentityId;

use crate::context::IdentityContext;

/// Header carrying the caller's identity, set by the upstream gateway after
/// it has authenticated the request.
pub const IDENTITY_HEADER: &str = "x-identity-id";

pub async fn identity_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let identity = extract_identity(req.headers());
    if identity.is_none() && req.headers().contains_key(IDENTITY_HEADER) {
        tracing::debug!("ignoring malformed identity header");
    }

    req.extensions_mut().insert(IdentityContext::new(identity));
    next.run(req).await
}

fn extract_identity(headers: &HeaderMap) -> Option<Identity> {
    let raw = headers.get(IDENTITY_HEADER)?.to_str().ok()?.trim();
    raw.parse::<IdentityId>().ok().map(Identity::new)
}
