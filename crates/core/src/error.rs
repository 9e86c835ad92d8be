//! Feed error model.

use thiserror::Error;

/// Result type used across the feed layers.
pub type FeedResult<T> = Result<T, FeedError>;

/// Feed-level error taxonomy.
///
/// Every component error (pagination, storage, authorization) converts into
/// one of these so a caller can tell a transient store failure apart from a
/// permanent authorization failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// A pagination token could not be decoded. Not retryable.
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),

    /// A request was structurally invalid (bad window, empty filter, ...).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The backing store failed. The caller may retry with backoff.
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    /// No identity was attached to the request.
    #[error("unauthenticated")]
    Unauthenticated,

    /// The identity lacks access to the requested data.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The requested subscription name is not routed to any topic.
    #[error("unknown topic: {0}")]
    UnknownTopic(String),

    /// The subscription channel was torn down.
    #[error("subscription closed")]
    SubscriptionClosed,
}

impl FeedError {
    pub fn invalid_cursor(msg: impl Into<String>) -> Self {
        Self::InvalidCursor(msg.into())
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn source_unavailable(msg: impl Into<String>) -> Self {
        Self::SourceUnavailable(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    /// Whether a caller may reasonably retry the operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SourceUnavailable(_))
    }

    /// Whether the error permanently ends a subscription.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Unauthenticated | Self::Unauthorized(_) | Self::SubscriptionClosed
        )
    }

    /// Stable machine-readable code (used in transport error frames).
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCursor(_) => "invalid_cursor",
            Self::InvalidRequest(_) => "invalid_request",
            Self::InvalidId(_) => "invalid_id",
            Self::SourceUnavailable(_) => "source_unavailable",
            Self::Unauthenticated => "unauthenticated",
            Self::Unauthorized(_) => "unauthorized",
            Self::UnknownTopic(_) => "unknown_topic",
            Self::SubscriptionClosed => "subscription_closed",
        }
    }
}
