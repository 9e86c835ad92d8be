//! Topic-based publish/subscribe mechanics for live feed delivery.

pub mod bus;
pub mod in_memory_bus;
pub mod mailbox;
pub mod scoped;
pub mod topic;

pub use bus::{Drain, RecvTimeoutError, SubscriberId, Subscription, TopicBus, TryRecvError};
pub use in_memory_bus::{DEFAULT_SUBSCRIBER_CAPACITY, InMemoryTopicBus};
pub use scoped::ScopedEvent;
pub use topic::Topic;
