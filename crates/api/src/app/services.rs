use std::sync::Arc;

use feedline_auth::{AuthGate, Identity, InMemoryMembershipDirectory, authorize_containers};
use feedline_core::{ContainerId, FeedError, IdentityId, NewRecord, Record};
use feedline_events::InMemoryTopicBus;
use feedline_infra::{
    ConnectionView, FeedConfig, FeedSubscription, InMemoryRecordStore, PageWindowResolver,
    PublishingRecordStore, RecordSource, RecordStore, SubscribeRequest, SubscriptionRouter,
    WindowSpec,
};

/// Bus carrying committed records to live subscribers.
pub type RecordBus = InMemoryTopicBus<Arc<Record>>;

/// Everything the HTTP handlers need, wired once at startup.
pub struct AppServices {
    store: Arc<dyn RecordStore>,
    source: Arc<dyn RecordSource>,
    bus: RecordBus,
    directory: Arc<InMemoryMembershipDirectory>,
    resolver: PageWindowResolver,
    subscriptions: SubscriptionRouter<RecordBus>,
}

impl AppServices {
    /// Pick the record store from config: Postgres when a database URL is set
    /// (and the `postgres` feature is enabled), in-memory otherwise.
    pub async fn from_config(config: &FeedConfig) -> anyhow::Result<Self> {
        match config.database_url.as_deref() {
            #[cfg(feature = "postgres")]
            Some(url) => {
                let store = feedline_infra::PostgresRecordStore::connect(url).await?;
                tracing::info!("using postgres record store");
                Ok(Self::wire(store, config))
            }
            #[cfg(not(feature = "postgres"))]
            Some(_) => {
                tracing::warn!("FEEDLINE_DATABASE_URL set but postgres support is not compiled in; using in-memory store");
                Ok(Self::in_memory(config))
            }
            None => Ok(Self::in_memory(config)),
        }
    }

    pub fn in_memory(config: &FeedConfig) -> Self {
        tracing::info!("using in-memory record store");
        Self::wire(InMemoryRecordStore::new(), config)
    }

    fn wire<S>(store: S, config: &FeedConfig) -> Self
    where
        S: RecordStore + 'static,
    {
        let bus = RecordBus::with_capacity(config.subscriber_capacity);
        let publishing = Arc::new(PublishingRecordStore::new(store, bus.clone()));
        let directory = Arc::new(InMemoryMembershipDirectory::new());
        let subscriptions =
            SubscriptionRouter::new(bus.clone(), directory.clone(), AuthGate::new(config.gate));

        Self {
            store: publishing.clone(),
            source: publishing,
            bus,
            directory,
            resolver: PageWindowResolver::new(config.pagination),
            subscriptions,
        }
    }

    pub fn bus(&self) -> &RecordBus {
        &self.bus
    }

    pub fn directory(&self) -> &InMemoryMembershipDirectory {
        &self.directory
    }

    /// Identity present and a member of `container_id`.
    pub async fn authorize(
        &self,
        identity: Option<&Identity>,
        container_id: ContainerId,
    ) -> Result<(), FeedError> {
        authorize_containers(self.directory.as_ref(), identity, &[container_id])
            .await
            .map_err(FeedError::from)
    }

    pub async fn list_records(
        &self,
        container_id: ContainerId,
        spec: &WindowSpec,
    ) -> Result<ConnectionView, FeedError> {
        let connection = self
            .resolver
            .resolve(container_id, spec, Arc::clone(&self.source))
            .await?;
        Ok(connection.into_view().await?)
    }

    pub async fn append_record(&self, record: NewRecord) -> Result<Record, FeedError> {
        Ok(self.store.append(record).await?)
    }

    pub fn grant_membership(&self, container_id: ContainerId, identity_id: IdentityId) {
        self.directory.grant(container_id, identity_id);
        tracing::info!(%container_id, %identity_id, "membership granted");
    }

    pub fn subscribe(&self, request: SubscribeRequest) -> Result<FeedSubscription, FeedError> {
        self.subscriptions.route(request)
    }
}
