use feedline_auth::Identity;
use feedline_core::FeedError;

/// Identity context for a request.
///
/// Always present on routed requests; empty when the caller sent no (or a
/// malformed) identity header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityContext {
    identity: Option<Identity>,
}

impl IdentityContext {
    pub fn new(identity: Option<Identity>) -> Self {
        Self { identity }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn into_identity(self) -> Option<Identity> {
        self.identity
    }

    pub fn require(&self) -> Result<&Identity, FeedError> {
        self.identity.as_ref().ok_or(FeedError::Unauthenticated)
    }
}
