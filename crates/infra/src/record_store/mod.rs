//! Record storage boundary.
//!
//! The feed only ever reads through [`RecordSource`]; writes go through
//! [`RecordStore`], optionally wrapped in [`PublishingRecordStore`] so every
//! committed record is fanned out to subscribers.

pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod r#trait;

use std::sync::Arc;

use async_trait::async_trait;

use feedline_core::{ContainerId, NewRecord, Record, RecordId};
use feedline_events::{Topic, TopicBus};

pub use in_memory::InMemoryRecordStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresRecordStore;
pub use r#trait::{RecordSource, RecordStore, ScanOrder, ScanRange, SourceError};

/// Adapter that publishes committed records to a `TopicBus` after a successful append.
///
/// Publish happens only after append succeeds, so subscribers never see a
/// record the store does not hold.
pub struct PublishingRecordStore<S, B> {
    store: S,
    bus: B,
    topic: Topic,
}

impl<S, B> PublishingRecordStore<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self::with_topic(store, bus, Topic::record_created())
    }

    pub fn with_topic(store: S, bus: B, topic: Topic) -> Self {
        Self { store, bus, topic }
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    pub fn into_parts(self) -> (S, B) {
        (self.store, self.bus)
    }
}

#[async_trait]
impl<S, B> RecordSource for PublishingRecordStore<S, B>
where
    S: RecordStore,
    B: TopicBus<Arc<Record>>,
{
    async fn scan(
        &self,
        container_id: ContainerId,
        range: ScanRange,
        order: ScanOrder,
        limit: usize,
    ) -> Result<Vec<Record>, SourceError> {
        self.store.scan(container_id, range, order, limit).await
    }

    async fn exists(&self, container_id: ContainerId, range: ScanRange) -> Result<bool, SourceError> {
        self.store.exists(container_id, range).await
    }
}

#[async_trait]
impl<S, B> RecordStore for PublishingRecordStore<S, B>
where
    S: RecordStore,
    B: TopicBus<Arc<Record>>,
{
    async fn append(&self, record: NewRecord) -> Result<Record, SourceError> {
        let committed = self.store.append(record).await?;

        let delivered = self.bus.publish(&self.topic, Arc::new(committed.clone()));
        tracing::debug!(
            topic = %self.topic,
            record_id = %committed.id,
            container_id = %committed.container_id,
            delivered,
            "record published"
        );

        Ok(committed)
    }

    async fn delete(&self, container_id: ContainerId, id: RecordId) -> Result<bool, SourceError> {
        self.store.delete(container_id, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedline_core::IdentityId;
    use feedline_events::InMemoryTopicBus;
    use serde_json::json;

    #[tokio::test]
    async fn append_publishes_committed_record() {
        let bus: InMemoryTopicBus<Arc<Record>> = InMemoryTopicBus::new();
        let sub = bus.subscribe(&Topic::record_created());
        let store = PublishingRecordStore::new(InMemoryRecordStore::new(), bus.clone());

        let c = ContainerId::new();
        let committed = store
            .append(NewRecord::new(c, IdentityId::new(), json!({ "text": "hi" })))
            .await
            .unwrap();

        let got = sub.try_recv().unwrap();
        assert_eq!(*got, committed);
        let stored = store.scan(c, ScanRange::all(), ScanOrder::NewestFirst, 10).await.unwrap();
        assert_eq!(stored, vec![committed]);
    }

    #[tokio::test]
    async fn failed_append_publishes_nothing() {
        struct Refusing;

        #[async_trait]
        impl RecordSource for Refusing {
            async fn scan(
                &self,
                _: ContainerId,
                _: ScanRange,
                _: ScanOrder,
                _: usize,
            ) -> Result<Vec<Record>, SourceError> {
                Ok(vec![])
            }
        }

        #[async_trait]
        impl RecordStore for Refusing {
            async fn append(&self, _: NewRecord) -> Result<Record, SourceError> {
                Err(SourceError::Unavailable("read-only".to_string()))
            }

            async fn delete(&self, _: ContainerId, _: RecordId) -> Result<bool, SourceError> {
                Ok(false)
            }
        }

        let bus: InMemoryTopicBus<Arc<Record>> = InMemoryTopicBus::new();
        let sub = bus.subscribe(&Topic::record_created());
        let store = PublishingRecordStore::new(Refusing, bus.clone());

        let err = store
            .append(NewRecord::new(ContainerId::new(), IdentityId::new(), json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Unavailable(_)));
        assert!(sub.try_recv().is_err());
    }
}
