use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use feedline_core::FeedError;

pub fn status_for(err: &FeedError) -> StatusCode {
    match err {
        FeedError::InvalidCursor(_) | FeedError::InvalidRequest(_) | FeedError::InvalidId(_) => {
            StatusCode::BAD_REQUEST
        }
        FeedError::SourceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        FeedError::Unauthenticated => StatusCode::UNAUTHORIZED,
        FeedError::Unauthorized(_) => StatusCode::FORBIDDEN,
        FeedError::UnknownTopic(_) => StatusCode::NOT_FOUND,
        FeedError::SubscriptionClosed => StatusCode::GONE,
    }
}

pub fn feed_error_to_response(err: FeedError) -> axum::response::Response {
    if err.is_retryable() {
        tracing::warn!(error = %err, "request failed on a retryable error");
    }
    json_error(status_for(&err), err.code(), err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Body of a terminal SSE `error` frame.
pub fn error_frame(err: &FeedError) -> serde_json::Value {
    json!({
        "error": err.code(),
        "message": err.to_string(),
    })
}
