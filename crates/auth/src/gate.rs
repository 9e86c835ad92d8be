//! One-time authorization in front of a live subscription.
//!
//! A [`GatedChannel`] wraps a bus [`Subscription`] and withholds every message
//! until the subscription's authorization check has resolved. The check runs
//! exactly once; its outcome is memoized in the gate's state machine:
//!
//! ```text
//! AwaitingAuth ──approve──▶ Active ──close/disconnect──▶ Closed
//!      │
//!      └──deny / timeout / abort──▶ Denied (terminal, self-closing)
//! ```
//!
//! Per-event filtering is not the gate's job; it only answers "may this
//! subscriber see anything at all".

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use feedline_events::{Drain, SubscriberId, Subscription, Topic};

use crate::authorize::AuthzError;

/// The deferred, possibly I/O-bound authorization check of one subscription.
pub type DeferredCheck = Pin<Box<dyn Future<Output = Result<(), AuthzError>> + Send + 'static>>;

/// What happens to messages published while the check is still pending.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingPolicy {
    /// Keep them in the subscriber's bounded mailbox (oldest dropped on
    /// overflow) and deliver them after approval.
    #[default]
    Buffer,
    /// Drop everything published before approval. The queue is cleared
    /// the moment the check approves, not when the consumer next polls.
    Discard,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GateConfig {
    /// Deadline for the authorization check, measured from gating.
    pub auth_timeout: Duration,
    pub pending_policy: PendingPolicy,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            auth_timeout: Duration::from_secs(10),
            pending_policy: PendingPolicy::Buffer,
        }
    }
}

/// Memoized outcome of a subscription's authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    Granted,
    Denied(AuthzError),
}

/// Observable state of a gated channel.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GateStatus {
    AwaitingAuth,
    Active,
    Denied,
    Closed,
}

enum GateState {
    AwaitingAuth {
        check: JoinHandle<Result<(), AuthzError>>,
        deadline: Instant,
    },
    Active,
    Denied {
        reported: bool,
    },
    Closed,
}

/// Factory for gated channels.
#[derive(Debug, Clone, Default)]
pub struct AuthGate {
    config: GateConfig,
}

impl AuthGate {
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Wrap `inner` behind `check`.
    ///
    /// The check is spawned immediately so it resolves while messages are
    /// buffering. Must be called from within a tokio runtime.
    pub fn gate<M>(&self, inner: Subscription<M>, check: DeferredCheck) -> GatedChannel<M>
    where
        M: Send + 'static,
    {
        let deadline = Instant::now() + self.config.auth_timeout;
        let check = match self.config.pending_policy {
            PendingPolicy::Buffer => tokio::spawn(check),
            PendingPolicy::Discard => tokio::spawn(discard_on_approval(check, inner.drain_handle())),
        };

        GatedChannel {
            inner,
            state: GateState::AwaitingAuth { check, deadline },
            decision: None,
            config: self.config,
        }
    }
}

/// A subscription that delivers nothing until it has been authorized.
pub struct GatedChannel<M> {
    inner: Subscription<M>,
    state: GateState,
    decision: Option<AuthDecision>,
    config: GateConfig,
}

impl<M> GatedChannel<M> {
    pub fn id(&self) -> SubscriberId {
        self.inner.id()
    }

    pub fn topic(&self) -> &Topic {
        self.inner.topic()
    }

    pub fn status(&self) -> GateStatus {
        match self.state {
            GateState::AwaitingAuth { .. } => GateStatus::AwaitingAuth,
            GateState::Active => GateStatus::Active,
            GateState::Denied { .. } => GateStatus::Denied,
            GateState::Closed => GateStatus::Closed,
        }
    }

    /// The memoized authorization outcome, once known.
    pub fn decision(&self) -> Option<&AuthDecision> {
        self.decision.as_ref()
    }

    /// Messages the inner subscription lost to overflow.
    pub fn dropped(&self) -> u64 {
        self.inner.dropped()
    }

    /// Wait for the authorization check to settle, without consuming a message.
    ///
    /// Resolves immediately once the decision is memoized.
    pub async fn authorize(&mut self) -> GateStatus {
        let outcome = match &mut self.state {
            GateState::AwaitingAuth { check, deadline } => {
                resolve_check(check, *deadline, self.config.auth_timeout).await
            }
            _ => return self.status(),
        };

        match outcome {
            Ok(()) => self.approve(),
            Err(err) => self.deny(err),
        }
        self.status()
    }

    /// Next authorized message.
    ///
    /// - While the check is pending, waits for it (bounded by the deadline).
    /// - On denial, yields exactly one `Err` and unregisters from the bus.
    /// - `None` once the channel is denied or closed.
    ///
    /// Cancel-safe: dropping the returned future leaves the pending check intact.
    pub async fn next(&mut self) -> Option<Result<M, AuthzError>> {
        self.authorize().await;

        match self.state {
            GateState::Active => match self.inner.recv().await {
                Some(message) => Some(Ok(message)),
                None => {
                    self.state = GateState::Closed;
                    None
                }
            },
            GateState::Denied { reported: false } => {
                self.state = GateState::Denied { reported: true };
                match &self.decision {
                    Some(AuthDecision::Denied(err)) => Some(Err(err.clone())),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Tear the channel down (unsubscribe / disconnect).
    ///
    /// A check still in flight keeps running; its result is discarded.
    pub fn close(&mut self) {
        self.inner.close();
        if !matches!(self.state, GateState::Denied { .. }) {
            self.state = GateState::Closed;
        }
    }

    fn approve(&mut self) {
        self.decision = Some(AuthDecision::Granted);
        self.state = GateState::Active;
        tracing::debug!(subscriber = %self.inner.id(), topic = %self.inner.topic(), "subscription authorized");
    }

    fn deny(&mut self, err: AuthzError) {
        tracing::warn!(subscriber = %self.inner.id(), topic = %self.inner.topic(), error = %err, "subscription denied");
        self.inner.close();
        self.decision = Some(AuthDecision::Denied(err));
        self.state = GateState::Denied { reported: false };
    }
}

// Runs inside the check task, so the cut-over happens when the check resolves.
async fn discard_on_approval<M>(check: DeferredCheck, pending: Drain<M>) -> Result<(), AuthzError> {
    let outcome = check.await;
    if outcome.is_ok() {
        let discarded = pending.drain();
        tracing::debug!(subscriber = %pending.subscriber(), discarded, "discarded messages published before approval");
    }
    outcome
}

async fn resolve_check(
    check: &mut JoinHandle<Result<(), AuthzError>>,
    deadline: Instant,
    timeout: Duration,
) -> Result<(), AuthzError> {
    match tokio::time::timeout_at(deadline, check).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => {
            tracing::warn!(error = %join_err, "authorization check did not complete");
            Err(AuthzError::CheckAborted)
        }
        Err(_) => Err(AuthzError::CheckTimedOut(timeout.as_millis() as u64)),
    }
}

impl<M> core::fmt::Debug for GatedChannel<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GatedChannel")
            .field("inner", &self.inner)
            .field("status", &self.status())
            .field("decision", &self.decision)
            .finish()
    }
}
