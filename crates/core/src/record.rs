use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::{ContainerId, IdentityId, RecordId};

/// A record ready to be appended to a container (not yet assigned an id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecord {
    pub container_id: ContainerId,
    pub author_id: IdentityId,
    pub payload: JsonValue,
}

impl NewRecord {
    pub fn new(container_id: ContainerId, author_id: IdentityId, payload: JsonValue) -> Self {
        Self {
            container_id,
            author_id,
            payload,
        }
    }
}

/// The unit of the feed: an immutable, store-assigned record.
///
/// Notes:
/// - `id` is assigned by the store and strictly increases; within a container
///   the larger id is always the newer record.
/// - `payload` is opaque to the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: RecordId,
    pub container_id: ContainerId,
    pub author_id: IdentityId,
    pub payload: JsonValue,
    pub created_at: DateTime<Utc>,
}

impl Record {
    /// Commit a `NewRecord` under a store-assigned id and timestamp.
    pub fn commit(new: NewRecord, id: RecordId, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            container_id: new.container_id,
            author_id: new.author_id,
            payload: new.payload,
            created_at,
        }
    }
}
