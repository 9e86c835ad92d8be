//! Membership lookups: which identities belong to which containers.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use thiserror::Error;

use feedline_core::{ContainerId, IdentityId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("membership directory unavailable: {0}")]
    Unavailable(String),
}

/// Source of container memberships.
///
/// Lookups are typically I/O-bound (a database or a remote service), which is
/// why subscription authorization runs them once per subscription rather than
/// once per event.
#[async_trait]
pub trait MembershipDirectory: Send + Sync {
    async fn is_member(
        &self,
        identity: IdentityId,
        container: ContainerId,
    ) -> Result<bool, DirectoryError>;
}

#[async_trait]
impl<D> MembershipDirectory for Arc<D>
where
    D: MembershipDirectory + ?Sized,
{
    async fn is_member(
        &self,
        identity: IdentityId,
        container: ContainerId,
    ) -> Result<bool, DirectoryError> {
        (**self).is_member(identity, container).await
    }
}

/// In-memory membership directory.
///
/// Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryMembershipDirectory {
    members: RwLock<HashMap<ContainerId, HashSet<IdentityId>>>,
}

impl InMemoryMembershipDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&self, container: ContainerId, identity: IdentityId) {
        let mut members = self.members.write().unwrap_or_else(PoisonError::into_inner);
        members.entry(container).or_default().insert(identity);
    }

    pub fn revoke(&self, container: ContainerId, identity: IdentityId) -> bool {
        let mut members = self.members.write().unwrap_or_else(PoisonError::into_inner);
        members
            .get_mut(&container)
            .map(|set| set.remove(&identity))
            .unwrap_or(false)
    }

    pub fn members_of(&self, container: ContainerId) -> Vec<IdentityId> {
        let members = self.members.read().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<_> = members
            .get(&container)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }
}

#[async_trait]
impl MembershipDirectory for InMemoryMembershipDirectory {
    async fn is_member(
        &self,
        identity: IdentityId,
        container: ContainerId,
    ) -> Result<bool, DirectoryError> {
        let members = self.members.read().unwrap_or_else(PoisonError::into_inner);
        Ok(members
            .get(&container)
            .is_some_and(|set| set.contains(&identity)))
    }
}
