use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use feedline_core::{ContainerId, IdentityId};
use feedline_events::ScopedEvent;

/// Arguments a client subscribes with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterArgs {
    pub container_ids: Vec<ContainerId>,
}

impl FilterArgs {
    pub fn new(container_ids: impl IntoIterator<Item = ContainerId>) -> Self {
        Self {
            container_ids: container_ids.into_iter().collect(),
        }
    }

    /// Requested containers, deduplicated and ordered.
    pub fn distinct_containers(&self) -> Vec<ContainerId> {
        self.container_ids
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Per-event visibility check of one subscription.
///
/// An event passes if it belongs to one of the subscribed containers and was
/// not authored by the subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFilter {
    containers: BTreeSet<ContainerId>,
    viewer: IdentityId,
}

impl RecordFilter {
    pub fn new(containers: impl IntoIterator<Item = ContainerId>, viewer: IdentityId) -> Self {
        Self {
            containers: containers.into_iter().collect(),
            viewer,
        }
    }

    pub fn viewer(&self) -> IdentityId {
        self.viewer
    }

    pub fn matches<E: ScopedEvent + ?Sized>(&self, event: &E) -> bool {
        self.containers.contains(&event.container_id()) && event.author_id() != self.viewer
    }
}
