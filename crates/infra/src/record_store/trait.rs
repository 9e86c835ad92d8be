use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use feedline_core::{ContainerId, FeedError, NewRecord, Record, RecordId};

/// Record storage operation error.
///
/// These are **infrastructure errors**; pagination and the transport layer
/// report them to callers as retryable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("invalid append: {0}")]
    InvalidAppend(String),
}

impl From<SourceError> for FeedError {
    fn from(value: SourceError) -> Self {
        match value {
            SourceError::Unavailable(msg) => FeedError::SourceUnavailable(msg),
            SourceError::InvalidAppend(msg) => FeedError::InvalidRequest(msg),
        }
    }
}

/// Exclusive id bounds for a scan within one container.
///
/// `older_than` keeps ids strictly below the bound, `newer_than` ids strictly
/// above it. Bounds need not name existing records.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ScanRange {
    pub older_than: Option<RecordId>,
    pub newer_than: Option<RecordId>,
}

impl ScanRange {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.older_than.is_none_or(|bound| id < bound)
            && self.newer_than.is_none_or(|bound| id > bound)
    }

    /// Whether no id can satisfy both bounds.
    pub fn is_empty(&self) -> bool {
        match (self.newer_than, self.older_than) {
            (Some(low), Some(high)) => low.get().saturating_add(1) >= high.get(),
            _ => false,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ScanOrder {
    NewestFirst,
    OldestFirst,
}

/// Ordered, bounded read access to a container's records.
///
/// This is the only storage primitive the feed needs: everything else about
/// the backing store is its own business.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Up to `limit` records of `container_id` inside `range`, in `order`.
    async fn scan(
        &self,
        container_id: ContainerId,
        range: ScanRange,
        order: ScanOrder,
        limit: usize,
    ) -> Result<Vec<Record>, SourceError>;

    /// Whether any record of `container_id` lies inside `range`.
    async fn exists(&self, container_id: ContainerId, range: ScanRange) -> Result<bool, SourceError> {
        Ok(!self
            .scan(container_id, range, ScanOrder::NewestFirst, 1)
            .await?
            .is_empty())
    }
}

/// Write side of record storage.
///
/// Implementations must:
/// - assign strictly increasing ids, never reused (also across deletes)
/// - stamp `created_at` so id order and time order agree within a container
#[async_trait]
pub trait RecordStore: RecordSource {
    async fn append(&self, record: NewRecord) -> Result<Record, SourceError>;

    /// Delete a record; returns whether it existed.
    async fn delete(&self, container_id: ContainerId, id: RecordId) -> Result<bool, SourceError>;
}

#[async_trait]
impl<S> RecordSource for Arc<S>
where
    S: RecordSource + ?Sized,
{
    async fn scan(
        &self,
        container_id: ContainerId,
        range: ScanRange,
        order: ScanOrder,
        limit: usize,
    ) -> Result<Vec<Record>, SourceError> {
        (**self).scan(container_id, range, order, limit).await
    }

    async fn exists(&self, container_id: ContainerId, range: ScanRange) -> Result<bool, SourceError> {
        (**self).exists(container_id, range).await
    }
}

#[async_trait]
impl<S> RecordStore for Arc<S>
where
    S: RecordStore + ?Sized,
{
    async fn append(&self, record: NewRecord) -> Result<Record, SourceError> {
        (**self).append(record).await
    }

    async fn delete(&self, container_id: ContainerId, id: RecordId) -> Result<bool, SourceError> {
        (**self).delete(container_id, id).await
    }
}
