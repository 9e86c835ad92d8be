//! `feedline-core`: feed domain building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the immutable `Record`, and the error taxonomy shared by every
//! layer of the feed.

pub mod error;
pub mod id;
pub mod record;

pub use error::{FeedError, FeedResult};
pub use id::{ContainerId, IdentityId, RecordId};
pub use record::{NewRecord, Record};
