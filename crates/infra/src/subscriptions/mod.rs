//! Live record subscriptions.
//!
//! `route` composes three stages per client:
//! 1. a bus subscription on the requested topic
//! 2. an `AuthGate` that withholds everything until the one-time membership
//!    check passes
//! 3. a `RecordFilter` applied to every event that gets through

pub mod feed;
pub mod filter;
pub mod router;

pub use feed::{FeedSubscription, SubscriptionState};
pub use filter::{FilterArgs, RecordFilter};
pub use router::{RECORD_CREATED_SUBSCRIPTION, SubscribeRequest, SubscriptionRouter};
