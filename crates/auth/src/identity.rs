use serde::{Deserialize, Serialize};

use feedline_core::IdentityId;

/// An authenticated principal (human user, service account, etc).
///
/// Construction happens outside the feed: whoever builds an `Identity` has
/// already verified the caller's credentials. Container memberships are not
/// carried here; they are queried through a
/// [`MembershipDirectory`](crate::MembershipDirectory).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    id: IdentityId,
}

impl Identity {
    pub fn new(id: IdentityId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> IdentityId {
        self.id
    }
}

impl From<IdentityId> for Identity {
    fn from(value: IdentityId) -> Self {
        Self::new(value)
    }
}

impl core::fmt::Display for Identity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.id, f)
    }
}
