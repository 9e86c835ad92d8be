use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use feedline_core::{ContainerId, Record};

use super::cursor::Cursor;
use super::PaginationError;
use crate::record_store::{RecordSource, ScanRange};

/// One record of a page plus its position token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub cursor: Cursor,
    pub node: Record,
}

struct Probe {
    source: Arc<dyn RecordSource>,
    container_id: ContainerId,
    range: ScanRange,
}

/// A page boundary flag that costs at most one existence probe, and only when read.
pub struct BoundaryFlag {
    value: OnceCell<bool>,
    probe: Option<Probe>,
}

impl BoundaryFlag {
    /// A flag whose value is already known.
    pub fn known(value: bool) -> Self {
        Self {
            value: OnceCell::new_with(Some(value)),
            probe: None,
        }
    }

    /// A flag answered by asking `source` whether anything lies in `range`.
    pub fn probe(source: Arc<dyn RecordSource>, container_id: ContainerId, range: ScanRange) -> Self {
        Self {
            value: OnceCell::new(),
            probe: Some(Probe {
                source,
                container_id,
                range,
            }),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.value.initialized()
    }

    pub async fn get(&self) -> Result<bool, PaginationError> {
        let value = self
            .value
            .get_or_try_init(|| async {
                match &self.probe {
                    Some(p) => {
                        tracing::debug!(container_id = %p.container_id, range = ?p.range, "probing page boundary");
                        let found = p.source.exists(p.container_id, p.range).await?;
                        Ok::<_, PaginationError>(found)
                    }
                    None => Ok(false),
                }
            })
            .await?;
        Ok(*value)
    }
}

impl core::fmt::Debug for BoundaryFlag {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BoundaryFlag")
            .field("value", &self.value.get())
            .field("probe", &self.probe.as_ref().map(|p| p.range))
            .finish()
    }
}

#[derive(Debug)]
pub struct PageInfo {
    has_next_page: BoundaryFlag,
    has_previous_page: BoundaryFlag,
}

impl PageInfo {
    pub fn new(has_next_page: BoundaryFlag, has_previous_page: BoundaryFlag) -> Self {
        Self {
            has_next_page,
            has_previous_page,
        }
    }

    /// Whether older records exist beyond this page.
    pub async fn has_next_page(&self) -> Result<bool, PaginationError> {
        self.has_next_page.get().await
    }

    /// Whether newer records exist beyond this page.
    pub async fn has_previous_page(&self) -> Result<bool, PaginationError> {
        self.has_previous_page.get().await
    }

    pub fn next_page_flag(&self) -> &BoundaryFlag {
        &self.has_next_page
    }

    pub fn previous_page_flag(&self) -> &BoundaryFlag {
        &self.has_previous_page
    }
}

/// A resolved page: edges newest-to-oldest, boundary flags evaluated on demand.
#[derive(Debug)]
pub struct Connection {
    edges: Vec<Edge>,
    page_info: PageInfo,
}

impl Connection {
    pub fn new(edges: Vec<Edge>, page_info: PageInfo) -> Self {
        Self { edges, page_info }
    }

    pub fn empty() -> Self {
        Self::new(
            vec![],
            PageInfo::new(BoundaryFlag::known(false), BoundaryFlag::known(false)),
        )
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn page_info(&self) -> &PageInfo {
        &self.page_info
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn into_edges(self) -> Vec<Edge> {
        self.edges
    }

    /// Resolve both flags and produce the wire shape.
    pub async fn into_view(self) -> Result<ConnectionView, PaginationError> {
        let has_next_page = self.page_info.has_next_page().await?;
        let has_previous_page = self.page_info.has_previous_page().await?;

        let start_cursor = self.edges.first().map(|e| e.cursor.clone());
        let end_cursor = self.edges.last().map(|e| e.cursor.clone());

        Ok(ConnectionView {
            edges: self.edges,
            page_info: PageInfoView {
                has_next_page,
                has_previous_page,
                start_cursor,
                end_cursor,
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfoView {
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub start_cursor: Option<Cursor>,
    pub end_cursor: Option<Cursor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionView {
    pub edges: Vec<Edge>,
    pub page_info: PageInfoView,
}
