//! Bounded per-subscriber delivery buffer.
//!
//! Publishing never blocks on a slow consumer: when a mailbox is full the
//! oldest queued message is displaced to make room for the new one.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

/// Outcome of pushing a message into a mailbox.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Push {
    /// Queued without loss.
    Queued,
    /// Queued, but the oldest buffered message was dropped to make room.
    Displaced,
    /// The mailbox is closed; the message was discarded.
    Closed,
}

#[derive(Debug)]
struct MailboxState<M> {
    items: VecDeque<M>,
    closed: bool,
    dropped: u64,
}

/// Single-consumer, bounded, drop-oldest queue.
#[derive(Debug)]
pub struct Mailbox<M> {
    state: Mutex<MailboxState<M>>,
    notify: Notify,
    capacity: usize,
}

impl<M> Mailbox<M> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(MailboxState {
                items: VecDeque::with_capacity(capacity),
                closed: false,
                dropped: 0,
            }),
            notify: Notify::new(),
            capacity,
        }
    }

    // A panic while holding the lock leaves the queue structurally valid.
    fn lock(&self) -> MutexGuard<'_, MailboxState<M>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn push(&self, message: M) -> Push {
        let outcome = {
            let mut state = self.lock();
            if state.closed {
                return Push::Closed;
            }

            let outcome = if state.items.len() >= self.capacity {
                state.items.pop_front();
                state.dropped += 1;
                Push::Displaced
            } else {
                Push::Queued
            };
            state.items.push_back(message);
            outcome
        };

        self.notify.notify_one();
        outcome
    }

    /// Pop the next message without waiting.
    ///
    /// `Err(true)` means the mailbox is closed, `Err(false)` that it is empty.
    pub fn try_pop(&self) -> Result<M, bool> {
        let mut state = self.lock();
        match state.items.pop_front() {
            Some(m) => Ok(m),
            None => Err(state.closed),
        }
    }

    /// Wait for the next message; `None` once closed.
    pub async fn pop(&self) -> Option<M> {
        loop {
            match self.try_pop() {
                Ok(m) => return Some(m),
                Err(true) => return None,
                Err(false) => self.notify.notified().await,
            }
        }
    }

    /// Discard everything currently queued; returns how many were discarded.
    pub fn drain(&self) -> usize {
        let mut state = self.lock();
        let n = state.items.len();
        state.items.clear();
        n
    }

    /// Close the mailbox and discard anything still queued.
    pub fn close(&self) {
        {
            let mut state = self.lock();
            state.closed = true;
            state.items.clear();
        }
        self.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of messages displaced by overflow so far.
    pub fn dropped(&self) -> u64 {
        self.lock().dropped
    }
}
