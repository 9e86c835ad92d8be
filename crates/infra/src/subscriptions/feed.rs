use std::sync::Arc;

use feedline_auth::{AuthDecision, GateStatus, GatedChannel};
use feedline_core::{FeedError, Record};
use feedline_events::{SubscriberId, Topic};

use super::filter::RecordFilter;

/// Lifecycle of a feed subscription.
///
/// ```text
/// Created ─▶ AwaitingAuth ─┬─▶ Active ─▶ Closed
///                          ├─▶ Denied
///                          └─▶ Closed
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SubscriptionState {
    Created,
    AwaitingAuth,
    Active,
    Denied,
    Closed,
}

impl SubscriptionState {
    pub fn can_transition_to(self, next: SubscriptionState) -> bool {
        use SubscriptionState::*;
        matches!(
            (self, next),
            (Created, AwaitingAuth)
                | (AwaitingAuth, Active)
                | (AwaitingAuth, Denied)
                | (AwaitingAuth, Closed)
                | (Active, Closed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SubscriptionState::Denied | SubscriptionState::Closed)
    }
}

impl core::fmt::Display for SubscriptionState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            SubscriptionState::Created => "created",
            SubscriptionState::AwaitingAuth => "awaiting_auth",
            SubscriptionState::Active => "active",
            SubscriptionState::Denied => "denied",
            SubscriptionState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// A live, authorized, filtered stream of records for one client.
///
/// Dropping it unsubscribes from the bus.
pub struct FeedSubscription {
    name: String,
    channel: GatedChannel<Arc<Record>>,
    filter: RecordFilter,
    state: SubscriptionState,
}

impl FeedSubscription {
    pub(crate) fn new(name: String, channel: GatedChannel<Arc<Record>>, filter: RecordFilter) -> Self {
        let mut sub = Self {
            name,
            channel,
            filter,
            state: SubscriptionState::Created,
        };
        sub.transition(SubscriptionState::AwaitingAuth);
        sub
    }

    pub fn id(&self) -> SubscriberId {
        self.channel.id()
    }

    /// Client-facing subscription name (e.g. `recordCreated`).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn topic(&self) -> &Topic {
        self.channel.topic()
    }

    pub fn state(&self) -> SubscriptionState {
        self.state
    }

    pub fn decision(&self) -> Option<&AuthDecision> {
        self.channel.decision()
    }

    /// Records lost to mailbox overflow.
    pub fn dropped(&self) -> u64 {
        self.channel.dropped()
    }

    /// Wait for the authorization decision without consuming a record.
    pub async fn authorized(&mut self) -> bool {
        let status = self.channel.authorize().await;
        self.sync(status);
        status == GateStatus::Active
    }

    /// Next record visible to this subscriber.
    ///
    /// Yields a single `Err` if authorization is denied, then `None`.
    pub async fn next(&mut self) -> Option<Result<Arc<Record>, FeedError>> {
        loop {
            if self.state.is_terminal() && self.state != SubscriptionState::Denied {
                return None;
            }

            let item = self.channel.next().await;
            let status = self.channel.status();
            self.sync(status);

            match item {
                Some(Ok(record)) => {
                    if self.filter.matches(&record) {
                        return Some(Ok(record));
                    }
                    tracing::trace!(subscriber = %self.id(), record_id = %record.id, "record filtered out");
                }
                Some(Err(err)) => return Some(Err(err.into())),
                None => return None,
            }
        }
    }

    /// Unsubscribe. Idempotent.
    pub fn close(&mut self) {
        self.channel.close();
        if !self.state.is_terminal() {
            self.transition(SubscriptionState::Closed);
        }
    }

    fn sync(&mut self, status: GateStatus) {
        let next = match status {
            GateStatus::AwaitingAuth => return,
            GateStatus::Active => SubscriptionState::Active,
            GateStatus::Denied => SubscriptionState::Denied,
            GateStatus::Closed => SubscriptionState::Closed,
        };
        if next != self.state {
            self.transition(next);
        }
    }

    fn transition(&mut self, next: SubscriptionState) {
        if self.state == next {
            return;
        }
        if !self.state.can_transition_to(next) {
            tracing::debug!(
                subscriber = %self.id(),
                from = %self.state,
                to = %next,
                "ignored invalid subscription transition"
            );
            return;
        }

        tracing::debug!(subscriber = %self.id(), from = %self.state, to = %next, "subscription transition");
        match next {
            SubscriptionState::Active => {
                tracing::info!(subscriber = %self.id(), subscription = %self.name, "subscription active")
            }
            SubscriptionState::Closed => {
                tracing::info!(subscriber = %self.id(), subscription = %self.name, "subscription closed")
            }
            _ => {}
        }
        self.state = next;
    }
}

impl core::fmt::Debug for FeedSubscription {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FeedSubscription")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("channel", &self.channel)
            .field("filter", &self.filter)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::SubscriptionState::*;

    #[test]
    fn transitions() {
        assert!(Created.can_transition_to(AwaitingAuth));
        assert!(AwaitingAuth.can_transition_to(Active));
        assert!(AwaitingAuth.can_transition_to(Denied));
        assert!(AwaitingAuth.can_transition_to(Closed));
        assert!(Active.can_transition_to(Closed));

        assert!(!Created.can_transition_to(Active));
        assert!(!Active.can_transition_to(Denied));
        assert!(!Denied.can_transition_to(Active));
        assert!(!Denied.can_transition_to(Closed));
        assert!(!Closed.can_transition_to(Active));
    }

    #[test]
    fn terminal_states() {
        assert!(Denied.is_terminal());
        assert!(Closed.is_terminal());
        assert!(!Active.is_terminal());
    }
}
