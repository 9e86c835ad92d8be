use serde::Deserialize;
use serde_json::Value as JsonValue;

use feedline_core::{ContainerId, FeedError, IdentityId};
use feedline_infra::{Cursor, FilterArgs, WindowSpec};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct ListRecordsQuery {
    pub first: Option<u32>,
    pub after: Option<String>,
    pub last: Option<u32>,
    pub before: Option<String>,
}

impl From<ListRecordsQuery> for WindowSpec {
    fn from(q: ListRecordsQuery) -> Self {
        WindowSpec {
            first: q.first,
            after: q.after.map(Cursor::from),
            last: q.last,
            before: q.before.map(Cursor::from),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateRecordRequest {
    pub payload: JsonValue,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubscriptionQuery {
    #[serde(rename = "containerIds")]
    pub container_ids: Option<String>,
}

impl SubscriptionQuery {
    /// Parse the comma-separated `containerIds` list.
    pub fn filter_args(&self) -> Result<FilterArgs, FeedError> {
        let ids = self
            .container_ids
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(parse_container_id)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(FilterArgs::new(ids))
    }
}

// -------------------------
// Path helpers
// -------------------------

pub fn parse_container_id(raw: &str) -> Result<ContainerId, FeedError> {
    raw.parse()
}

pub fn parse_identity_id(raw: &str) -> Result<IdentityId, FeedError> {
    raw.parse()
}
