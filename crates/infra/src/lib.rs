//! Infrastructure layer: record storage, pagination, subscription routing, config.

pub mod config;
pub mod pagination;
pub mod record_store;
pub mod subscriptions;

pub use config::{ConfigError, FeedConfig};
pub use pagination::{
    BoundaryFlag, Connection, ConnectionView, Cursor, CursorCodec, Edge, PageInfo, PageInfoView,
    PageWindowResolver, PaginationConfig, PaginationError, WindowSpec,
};
#[cfg(feature = "postgres")]
pub use record_store::PostgresRecordStore;
pub use record_store::{
    InMemoryRecordStore, PublishingRecordStore, RecordSource, RecordStore, ScanOrder, ScanRange,
    SourceError,
};
pub use subscriptions::{
    FeedSubscription, FilterArgs, RECORD_CREATED_SUBSCRIPTION, RecordFilter, SubscribeRequest,
    SubscriptionRouter, SubscriptionState,
};
