use std::sync::Arc;

use feedline_core::{ContainerId, IdentityId, Record};

/// Helper trait for container-scoped messages.
///
/// Marks bus messages that belong to exactly one container and have an
/// author, so subscription filters can decide per event whether a subscriber
/// may see it without knowing the concrete message type.
pub trait ScopedEvent {
    fn container_id(&self) -> ContainerId;

    fn author_id(&self) -> IdentityId;
}

impl ScopedEvent for Record {
    fn container_id(&self) -> ContainerId {
        self.container_id
    }

    fn author_id(&self) -> IdentityId {
        self.author_id
    }
}

impl<T> ScopedEvent for Arc<T>
where
    T: ScopedEvent + ?Sized,
{
    fn container_id(&self) -> ContainerId {
        (**self).container_id()
    }

    fn author_id(&self) -> IdentityId {
        (**self).author_id()
    }
}
