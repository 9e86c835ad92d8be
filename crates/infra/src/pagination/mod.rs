//! Cursor pagination over a container's records (Relay connection shape).
//!
//! - `cursor`: opaque position tokens
//! - `window`: the requested slice (`first`/`after`, `last`/`before`)
//! - `connection`: the resolved page with lazily evaluated boundary flags
//! - `resolver`: turns a window into a connection against a `RecordSource`

pub mod connection;
pub mod cursor;
pub mod resolver;
pub mod window;

use thiserror::Error;

use feedline_core::FeedError;

use crate::record_store::SourceError;

pub use connection::{BoundaryFlag, Connection, ConnectionView, Edge, PageInfo, PageInfoView};
pub use cursor::{Cursor, CursorCodec};
pub use resolver::PageWindowResolver;
pub use window::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, PaginationConfig, WindowSpec};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PaginationError {
    #[error("invalid cursor: {0:?}")]
    InvalidCursor(String),

    #[error(transparent)]
    SourceUnavailable(#[from] SourceError),
}

impl From<PaginationError> for FeedError {
    fn from(value: PaginationError) -> Self {
        match value {
            PaginationError::InvalidCursor(raw) => FeedError::InvalidCursor(raw),
            PaginationError::SourceUnavailable(err) => err.into(),
        }
    }
}
