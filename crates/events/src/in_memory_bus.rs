//! In-process topic bus.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use crate::bus::{Detach, SubscriberId, Subscription, TopicBus};
use crate::mailbox::{Mailbox, Push};
use crate::topic::Topic;

/// Mailbox bound used by [`InMemoryTopicBus::new`].
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 64;

#[derive(Debug)]
struct Subscriber<M> {
    id: SubscriberId,
    mailbox: Arc<Mailbox<M>>,
}

#[derive(Debug)]
struct Registry<M> {
    topics: RwLock<HashMap<Topic, Vec<Subscriber<M>>>>,
    next_id: AtomicU64,
    capacity: usize,
}

impl<M> Registry<M> {
    fn remove(&self, topic: &Topic, ids: &[SubscriberId]) -> bool {
        let mut topics = self.topics.write().unwrap_or_else(PoisonError::into_inner);
        let Some(subs) = topics.get_mut(topic) else {
            return false;
        };

        let before = subs.len();
        subs.retain(|s| !ids.contains(&s.id));
        let removed = subs.len() != before;

        if subs.is_empty() {
            topics.remove(topic);
        }
        removed
    }
}

impl<M: Send> Detach for Registry<M> {
    fn detach(&self, topic: &Topic, id: SubscriberId) {
        if self.remove(topic, &[id]) {
            tracing::debug!(%topic, subscriber = %id, "subscriber detached");
        }
    }
}

/// In-memory pub/sub bus.
///
/// - No IO
/// - Synchronous, non-blocking fan-out into bounded per-subscriber mailboxes
/// - Explicit instance: share it by `Arc` with every component that publishes
///   or subscribes
#[derive(Debug)]
pub struct InMemoryTopicBus<M> {
    inner: Arc<Registry<M>>,
}

impl<M> InMemoryTopicBus<M> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SUBSCRIBER_CAPACITY)
    }

    /// Create a bus whose subscribers buffer at most `capacity` messages each.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Registry {
                topics: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                capacity: capacity.max(1),
            }),
        }
    }

    pub fn subscriber_capacity(&self) -> usize {
        self.inner.capacity
    }
}

impl<M> Clone for InMemoryTopicBus<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M> Default for InMemoryTopicBus<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> TopicBus<M> for InMemoryTopicBus<M>
where
    M: Clone + Send + 'static,
{
    fn publish(&self, topic: &Topic, message: M) -> usize {
        let mut delivered = 0;
        let mut stale = Vec::new();

        {
            let topics = self.inner.topics.read().unwrap_or_else(PoisonError::into_inner);
            let Some(subs) = topics.get(topic) else {
                return 0;
            };

            for sub in subs {
                let outcome =
                    panic::catch_unwind(AssertUnwindSafe(|| sub.mailbox.push(message.clone())));

                match outcome {
                    Ok(Push::Queued) => delivered += 1,
                    Ok(Push::Displaced) => {
                        delivered += 1;
                        tracing::debug!(%topic, subscriber = %sub.id, "mailbox full; dropped oldest message");
                    }
                    Ok(Push::Closed) => stale.push(sub.id),
                    Err(_) => {
                        tracing::warn!(%topic, subscriber = %sub.id, "delivery panicked; pruning subscriber");
                        sub.mailbox.close();
                        stale.push(sub.id);
                    }
                }
            }
        }

        if !stale.is_empty() {
            self.inner.remove(topic, &stale);
        }

        delivered
    }

    fn subscribe(&self, topic: &Topic) -> Subscription<M> {
        let id = SubscriberId::new(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let mailbox = Arc::new(Mailbox::new(self.inner.capacity));

        {
            let mut topics = self.inner.topics.write().unwrap_or_else(PoisonError::into_inner);
            topics.entry(topic.clone()).or_default().push(Subscriber {
                id,
                mailbox: mailbox.clone(),
            });
        }
        tracing::debug!(%topic, subscriber = %id, "subscriber registered");

        let inner: Arc<dyn Detach> = self.inner.clone();
        let registry: Weak<dyn Detach> = Arc::downgrade(&inner);
        Subscription::new(id, topic.clone(), mailbox, registry)
    }

    fn unsubscribe(&self, topic: &Topic, id: SubscriberId) -> bool {
        let mailbox = {
            let topics = self.inner.topics.read().unwrap_or_else(PoisonError::into_inner);
            topics
                .get(topic)
                .and_then(|subs| subs.iter().find(|s| s.id == id))
                .map(|s| s.mailbox.clone())
        };

        match mailbox {
            Some(mailbox) => {
                mailbox.close();
                self.inner.remove(topic, &[id])
            }
            None => false,
        }
    }

    fn subscriber_count(&self, topic: &Topic) -> usize {
        let topics = self.inner.topics.read().unwrap_or_else(PoisonError::into_inner);
        topics.get(topic).map(Vec::len).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::TryRecvError;
    use std::time::Duration;

    fn topic() -> Topic {
        Topic::new("test.topic")
    }

    #[test]
    fn fan_out_reaches_every_subscriber() {
        let bus = InMemoryTopicBus::new();
        let a = bus.subscribe(&topic());
        let b = bus.subscribe(&topic());

        assert_eq!(bus.publish(&topic(), 1u32), 2);
        assert_eq!(a.try_recv(), Ok(1));
        assert_eq!(b.try_recv(), Ok(1));
    }

    #[test]
    fn topics_are_isolated() {
        let bus = InMemoryTopicBus::new();
        let a = bus.subscribe(&Topic::new("a"));

        assert_eq!(bus.publish(&Topic::new("b"), 1u32), 0);
        assert_eq!(a.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn late_subscriber_misses_earlier_events() {
        let bus = InMemoryTopicBus::new();
        bus.publish(&topic(), 1u32);

        let late = bus.subscribe(&topic());
        bus.publish(&topic(), 2u32);

        assert_eq!(late.try_recv(), Ok(2));
        assert_eq!(late.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn per_subscriber_order_matches_publish_order() {
        let bus = InMemoryTopicBus::new();
        let sub = bus.subscribe(&topic());

        for e in ["e1", "e2", "e3"] {
            bus.publish(&topic(), e);
        }

        let seen: Vec<_> = std::iter::from_fn(|| sub.try_recv().ok()).collect();
        assert_eq!(seen, vec!["e1", "e2", "e3"]);
    }

    #[test]
    fn dropping_a_subscription_unregisters_it_synchronously() {
        let bus = InMemoryTopicBus::<u32>::new();
        let sub = bus.subscribe(&topic());
        assert_eq!(bus.subscriber_count(&topic()), 1);

        drop(sub);
        assert_eq!(bus.subscriber_count(&topic()), 0);
        assert_eq!(bus.publish(&topic(), 1), 0);
    }

    #[test]
    fn explicit_unsubscribe_closes_the_handle() {
        let bus = InMemoryTopicBus::<u32>::new();
        let sub = bus.subscribe(&topic());

        assert!(bus.unsubscribe(&topic(), sub.id()));
        assert!(!bus.unsubscribe(&topic(), sub.id()));
        assert_eq!(sub.try_recv(), Err(TryRecvError::Closed));
    }

    #[test]
    fn drain_handle_discards_queue_but_keeps_subscription() {
        let bus = InMemoryTopicBus::new();
        let sub = bus.subscribe(&topic());
        let drain = sub.drain_handle();
        assert_eq!(drain.subscriber(), sub.id());

        bus.publish(&topic(), 1u32);
        bus.publish(&topic(), 2u32);
        assert_eq!(drain.drain(), 2);

        bus.publish(&topic(), 3u32);
        assert_eq!(sub.try_recv(), Ok(3));
        assert_eq!(bus.subscriber_count(&topic()), 1);
    }

    #[test]
    fn slow_subscriber_loses_oldest_without_blocking_others() {
        let bus = InMemoryTopicBus::with_capacity(2);
        let slow = bus.subscribe(&topic());
        let fast = bus.subscribe(&topic());

        for i in 0..5u32 {
            bus.publish(&topic(), i);
            assert_eq!(fast.try_recv(), Ok(i));
        }

        assert_eq!(slow.dropped(), 3);
        assert_eq!(slow.try_recv(), Ok(3));
        assert_eq!(slow.try_recv(), Ok(4));
    }

    #[derive(Debug)]
    struct Explosive(bool);

    impl Clone for Explosive {
        fn clone(&self) -> Self {
            if self.0 {
                panic!("clone failed");
            }
            Explosive(false)
        }
    }

    #[test]
    fn a_failing_delivery_is_isolated_and_pruned() {
        let bus = InMemoryTopicBus::<Explosive>::new();
        let _first = bus.subscribe(&topic());
        let _second = bus.subscribe(&topic());

        // Every clone of a "hot" message panics: both deliveries fail, neither
        // failure aborts the publish call.
        let delivered = bus.publish(&topic(), Explosive(true));
        assert_eq!(delivered, 0);
        assert_eq!(bus.subscriber_count(&topic()), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_publishers_and_subscribers() {
        let bus = Arc::new(InMemoryTopicBus::with_capacity(1024));
        let sub = bus.subscribe(&topic());

        let mut publishers = Vec::new();
        for p in 0..4u32 {
            let bus = bus.clone();
            publishers.push(tokio::spawn(async move {
                for i in 0..100u32 {
                    bus.publish(&topic(), p * 1000 + i);
                    // Subscribers churning alongside the publishers.
                    let churn = bus.subscribe(&topic());
                    drop(churn);
                }
            }));
        }
        for p in publishers {
            p.await.unwrap();
        }

        let mut per_publisher: HashMap<u32, Vec<u32>> = HashMap::new();
        while let Ok(v) = sub.recv_timeout(Duration::from_millis(50)).await {
            per_publisher.entry(v / 1000).or_default().push(v % 1000);
        }

        assert_eq!(per_publisher.len(), 4);
        for seq in per_publisher.values() {
            // Each publisher's events arrive complete and in its publish order.
            assert_eq!(seq, &(0..100).collect::<Vec<_>>());
        }
        assert_eq!(bus.subscriber_count(&topic()), 1);
    }
}
