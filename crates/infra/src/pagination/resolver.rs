use std::sync::Arc;

use tracing::instrument;

use feedline_core::ContainerId;

use super::connection::{BoundaryFlag, Connection, Edge, PageInfo};
use super::cursor::CursorCodec;
use super::window::{Direction, PaginationConfig, WindowPlan, WindowSpec};
use super::PaginationError;
use crate::record_store::{RecordSource, ScanRange};

/// Resolves a [`WindowSpec`] into a [`Connection`] for one container.
///
/// Rules:
/// - cursors are decoded before the source is touched
/// - forward windows scan newest-first below `after`, backward windows scan
///   oldest-first above `before` and are reversed, so edges are always
///   newest-to-oldest
/// - a page shorter than requested has no next page in its direction; a full
///   page answers that flag with one existence probe, run only when read
/// - the flag facing away from the paging direction is always `false`
#[derive(Debug, Clone, Default)]
pub struct PageWindowResolver {
    config: PaginationConfig,
}

impl PageWindowResolver {
    pub fn new(config: PaginationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PaginationConfig {
        &self.config
    }

    #[instrument(skip(self, source), fields(container_id = %container_id), err)]
    pub async fn resolve(
        &self,
        container_id: ContainerId,
        spec: &WindowSpec,
        source: Arc<dyn RecordSource>,
    ) -> Result<Connection, PaginationError> {
        let plan = WindowPlan::from_spec(spec, &self.config)?;
        if plan.limit == 0 {
            return Ok(Connection::empty());
        }

        let limit = plan.limit as usize;
        let mut records = source
            .scan(container_id, plan.range, plan.direction.scan_order(), limit)
            .await?;
        let full_page = records.len() >= limit;

        if plan.direction == Direction::Backward {
            records.reverse();
        }

        let beyond = |range: ScanRange| {
            if full_page {
                BoundaryFlag::probe(Arc::clone(&source), container_id, range)
            } else {
                BoundaryFlag::known(false)
            }
        };

        let page_info = match plan.direction {
            Direction::Forward => {
                let older = ScanRange {
                    older_than: records.last().map(|r| r.id),
                    newer_than: plan.range.newer_than,
                };
                PageInfo::new(beyond(older), BoundaryFlag::known(false))
            }
            Direction::Backward => {
                let newer = ScanRange {
                    older_than: plan.range.older_than,
                    newer_than: records.first().map(|r| r.id),
                };
                PageInfo::new(BoundaryFlag::known(false), beyond(newer))
            }
        };

        tracing::debug!(
            direction = ?plan.direction,
            limit,
            returned = records.len(),
            "page resolved"
        );

        let edges = records
            .into_iter()
            .map(|node| Edge {
                cursor: CursorCodec::encode(node.id),
                node,
            })
            .collect();

        Ok(Connection::new(edges, page_info))
    }
}
