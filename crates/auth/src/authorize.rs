use std::sync::Arc;

use thiserror::Error;

use feedline_core::{ContainerId, FeedError};

use crate::directory::{DirectoryError, MembershipDirectory};
use crate::gate::DeferredCheck;
use crate::Identity;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("unauthenticated")]
    Unauthenticated,

    #[error("not a member of container {0}")]
    NotAMember(ContainerId),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error("authorization check timed out after {0} ms")]
    CheckTimedOut(u64),

    #[error("authorization check aborted")]
    CheckAborted,
}

impl From<AuthzError> for FeedError {
    fn from(value: AuthzError) -> Self {
        match value {
            AuthzError::Unauthenticated => FeedError::Unauthenticated,
            AuthzError::Directory(DirectoryError::Unavailable(msg)) => {
                FeedError::SourceUnavailable(msg)
            }
            other => FeedError::Unauthorized(other.to_string()),
        }
    }
}

/// Authorize an identity for every container in `containers`.
///
/// - Missing identity is `Unauthenticated`
/// - The first container the identity does not belong to is reported
/// - Directory failures surface as-is so callers can tell them from denials
pub async fn authorize_containers(
    directory: &dyn MembershipDirectory,
    identity: Option<&Identity>,
    containers: &[ContainerId],
) -> Result<(), AuthzError> {
    let identity = identity.ok_or(AuthzError::Unauthenticated)?;

    for &container in containers {
        if !directory.is_member(identity.id(), container).await? {
            return Err(AuthzError::NotAMember(container));
        }
    }

    Ok(())
}

/// Build the one-time access check for a subscription.
///
/// Nothing runs until the returned future is polled (the gate spawns it).
pub fn container_access_check(
    directory: Arc<dyn MembershipDirectory>,
    identity: Option<Identity>,
    containers: Vec<ContainerId>,
) -> DeferredCheck {
    Box::pin(async move {
        authorize_containers(directory.as_ref(), identity.as_ref(), &containers).await
    })
}
