//! `feedline-auth`: authorization boundary for feed reads and subscriptions.
//!
//! Identities arrive already authenticated; this crate only decides what an
//! identity may see. It has no HTTP or storage dependencies.

pub mod authorize;
pub mod directory;
pub mod gate;
pub mod identity;

pub use authorize::{AuthzError, authorize_containers, container_access_check};
pub use directory::{DirectoryError, InMemoryMembershipDirectory, MembershipDirectory};
pub use gate::{AuthDecision, AuthGate, DeferredCheck, GateConfig, GateStatus, GatedChannel, PendingPolicy};
pub use identity::Identity;
