use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::Utc;

use feedline_core::{ContainerId, NewRecord, Record, RecordId};

use super::r#trait::{RecordSource, RecordStore, ScanOrder, ScanRange, SourceError};

#[derive(Debug, Default)]
struct State {
    containers: HashMap<ContainerId, BTreeMap<RecordId, Record>>,
    last_id: u64,
}

/// In-memory record store.
///
/// Intended for tests/dev. Ids come from one store-wide sequence, so they are
/// monotonic across containers as well as within them.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    state: RwLock<State>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live records in a container.
    pub fn len(&self, container_id: ContainerId) -> usize {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.containers.get(&container_id).map(BTreeMap::len).unwrap_or(0)
    }

    pub fn is_empty(&self, container_id: ContainerId) -> bool {
        self.len(container_id) == 0
    }
}

#[async_trait]
impl RecordSource for InMemoryRecordStore {
    async fn scan(
        &self,
        container_id: ContainerId,
        range: ScanRange,
        order: ScanOrder,
        limit: usize,
    ) -> Result<Vec<Record>, SourceError> {
        if limit == 0 || range.is_empty() {
            return Ok(vec![]);
        }

        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let Some(records) = state.containers.get(&container_id) else {
            return Ok(vec![]);
        };

        let lower = range.newer_than.map_or(Bound::Unbounded, Bound::Excluded);
        let upper = range.older_than.map_or(Bound::Unbounded, Bound::Excluded);
        let window = records.range((lower, upper)).map(|(_, r)| r.clone());

        Ok(match order {
            ScanOrder::NewestFirst => window.rev().take(limit).collect(),
            ScanOrder::OldestFirst => window.take(limit).collect(),
        })
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn append(&self, record: NewRecord) -> Result<Record, SourceError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        let next = state
            .last_id
            .checked_add(1)
            .ok_or_else(|| SourceError::InvalidAppend("record id space exhausted".to_string()))?;
        let id = RecordId::new(next).map_err(|e| SourceError::InvalidAppend(e.to_string()))?;
        state.last_id = next;

        let committed = Record::commit(record, id, Utc::now());
        state
            .containers
            .entry(committed.container_id)
            .or_default()
            .insert(id, committed.clone());

        Ok(committed)
    }

    async fn delete(&self, container_id: ContainerId, id: RecordId) -> Result<bool, SourceError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        Ok(state
            .containers
            .get_mut(&container_id)
            .and_then(|records| records.remove(&id))
            .is_some())
    }
}
