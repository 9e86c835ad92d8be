//! Topic publish/subscribe abstraction (mechanics only).
//!
//! The bus is the live half of the feed: it distributes records to whoever is
//! listening *right now*. It is not a log.
//!
//! ## Delivery guarantees
//!
//! - **Fan-out at call time**: `publish` delivers to the subscribers registered
//!   on the topic when it is called; later subscribers never see the message.
//! - **Per-subscriber FIFO**: a single subscriber observes messages in the order
//!   `publish` was called.
//! - **At-most-once, best-effort**: each subscriber owns a bounded mailbox; a
//!   slow consumer loses its oldest queued messages rather than slowing the
//!   publisher down.
//! - **Isolation**: a failure while delivering to one subscriber never prevents
//!   delivery to the others.

use std::sync::{Arc, Weak};
use std::time::Duration;

use thiserror::Error;

use crate::mailbox::Mailbox;
use crate::topic::Topic;

/// Identifier of a registered subscriber, unique per bus.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl core::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

#[derive(Debug, Error, Copy, Clone, PartialEq, Eq)]
pub enum TryRecvError {
    #[error("no message queued")]
    Empty,
    #[error("subscription closed")]
    Closed,
}

#[derive(Debug, Error, Copy, Clone, PartialEq, Eq)]
pub enum RecvTimeoutError {
    #[error("timed out waiting for a message")]
    Timeout,
    #[error("subscription closed")]
    Closed,
}

/// Registry side of a subscription: how a handle removes itself from its bus.
pub trait Detach: Send + Sync {
    fn detach(&self, topic: &Topic, id: SubscriberId);
}

/// A live subscription to one topic.
///
/// Dropping (or closing) the handle synchronously unregisters it from the bus,
/// so no further fan-out work is spent on it.
///
/// ## Usage Pattern
///
/// ```ignore
/// let bus = Arc::new(InMemoryTopicBus::<Arc<Record>>::new());
/// let subscription = bus.subscribe(&Topic::record_created());
///
/// while let Some(record) = subscription.recv().await {
///     forward(record);
/// }
/// ```
pub struct Subscription<M> {
    id: SubscriberId,
    topic: Topic,
    mailbox: Arc<Mailbox<M>>,
    registry: Weak<dyn Detach>,
}

impl<M> Subscription<M> {
    pub fn new(
        id: SubscriberId,
        topic: Topic,
        mailbox: Arc<Mailbox<M>>,
        registry: Weak<dyn Detach>,
    ) -> Self {
        Self {
            id,
            topic,
            mailbox,
            registry,
        }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Wait for the next message. Returns `None` once the subscription is closed.
    pub async fn recv(&self) -> Option<M> {
        self.mailbox.pop().await
    }

    /// Take a message without waiting.
    pub fn try_recv(&self) -> Result<M, TryRecvError> {
        self.mailbox.try_pop().map_err(|closed| {
            if closed {
                TryRecvError::Closed
            } else {
                TryRecvError::Empty
            }
        })
    }

    /// Wait up to `timeout` for the next message.
    pub async fn recv_timeout(&self, timeout: Duration) -> Result<M, RecvTimeoutError> {
        match tokio::time::timeout(timeout, self.mailbox.pop()).await {
            Ok(Some(m)) => Ok(m),
            Ok(None) => Err(RecvTimeoutError::Closed),
            Err(_) => Err(RecvTimeoutError::Timeout),
        }
    }

    /// Discard everything currently queued for this subscriber.
    pub fn drain(&self) -> usize {
        self.mailbox.drain()
    }

    /// A handle that can discard this subscriber's queue from another task.
    pub fn drain_handle(&self) -> Drain<M> {
        Drain {
            id: self.id,
            mailbox: Arc::clone(&self.mailbox),
        }
    }

    /// Messages lost to mailbox overflow so far.
    pub fn dropped(&self) -> u64 {
        self.mailbox.dropped()
    }

    pub fn is_closed(&self) -> bool {
        self.mailbox.is_closed()
    }

    /// Unregister from the bus and discard anything still queued.
    ///
    /// Idempotent.
    pub fn close(&self) {
        if self.mailbox.is_closed() {
            return;
        }
        self.mailbox.close();
        if let Some(registry) = self.registry.upgrade() {
            registry.detach(&self.topic, self.id);
        }
    }
}

impl<M> Drop for Subscription<M> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<M> core::fmt::Debug for Subscription<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("topic", &self.topic)
            .field("queued", &self.mailbox.len())
            .field("closed", &self.mailbox.is_closed())
            .finish()
    }
}

/// Discards a subscriber's queued messages without owning the subscription.
pub struct Drain<M> {
    id: SubscriberId,
    mailbox: Arc<Mailbox<M>>,
}

impl<M> Drain<M> {
    pub fn subscriber(&self) -> SubscriberId {
        self.id
    }

    /// Discard everything currently queued; returns how many were discarded.
    pub fn drain(&self) -> usize {
        self.mailbox.drain()
    }
}

impl<M> core::fmt::Debug for Drain<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Drain").field("subscriber", &self.id).finish()
    }
}

/// Topic-addressed publish/subscribe bus.
///
/// Implementations must be safe to share across threads: `publish` may be
/// called concurrently from many write paths while subscribers come and go.
pub trait TopicBus<M>: Send + Sync {
    /// Fan `message` out to every subscriber currently registered on `topic`.
    ///
    /// Fire-and-forget: returns how many subscribers the message was queued for.
    fn publish(&self, topic: &Topic, message: M) -> usize;

    /// Register a new subscriber on `topic`.
    fn subscribe(&self, topic: &Topic) -> Subscription<M>;

    /// Remove a subscriber; returns whether it was registered.
    fn unsubscribe(&self, topic: &Topic, id: SubscriberId) -> bool;

    /// Number of live subscribers on `topic`.
    fn subscriber_count(&self, topic: &Topic) -> usize;
}

impl<M, B> TopicBus<M> for Arc<B>
where
    B: TopicBus<M> + ?Sized,
{
    fn publish(&self, topic: &Topic, message: M) -> usize {
        (**self).publish(topic, message)
    }

    fn subscribe(&self, topic: &Topic) -> Subscription<M> {
        (**self).subscribe(topic)
    }

    fn unsubscribe(&self, topic: &Topic, id: SubscriberId) -> bool {
        (**self).unsubscribe(topic, id)
    }

    fn subscriber_count(&self, topic: &Topic) -> usize {
        (**self).subscriber_count(topic)
    }
}
