use serde::{Deserialize, Serialize};

use feedline_core::RecordId;

use super::cursor::{Cursor, CursorCodec};
use super::PaginationError;
use crate::record_store::{ScanOrder, ScanRange};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Requested slice of a container's feed.
///
/// `first`/`after` page towards older records, `last`/`before` towards newer
/// ones. When both counts are given, `last` wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSpec {
    #[serde(default)]
    pub first: Option<u32>,
    #[serde(default)]
    pub after: Option<Cursor>,
    #[serde(default)]
    pub last: Option<u32>,
    #[serde(default)]
    pub before: Option<Cursor>,
}

impl WindowSpec {
    pub fn forward(first: u32, after: Option<Cursor>) -> Self {
        Self {
            first: Some(first),
            after,
            ..Self::default()
        }
    }

    pub fn backward(last: u32, before: Option<Cursor>) -> Self {
        Self {
            last: Some(last),
            before,
            ..Self::default()
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationConfig {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

impl PaginationConfig {
    fn clamp(&self, n: u32) -> u32 {
        n.min(self.max_page_size)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub(crate) fn scan_order(self) -> ScanOrder {
        match self {
            Direction::Forward => ScanOrder::NewestFirst,
            Direction::Backward => ScanOrder::OldestFirst,
        }
    }
}

/// A validated `WindowSpec`: cursors decoded, count resolved.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct WindowPlan {
    pub direction: Direction,
    pub limit: u32,
    pub range: ScanRange,
}

impl WindowPlan {
    pub(crate) fn from_spec(
        spec: &WindowSpec,
        config: &PaginationConfig,
    ) -> Result<Self, PaginationError> {
        let older_than = decode(spec.after.as_ref())?;
        let newer_than = decode(spec.before.as_ref())?;

        let (direction, requested) = match (spec.last, spec.first) {
            (Some(n), _) => (Direction::Backward, n),
            (None, Some(n)) => (Direction::Forward, n),
            (None, None) => (Direction::Forward, config.default_page_size),
        };

        Ok(Self {
            direction,
            limit: config.clamp(requested),
            range: ScanRange {
                older_than,
                newer_than,
            },
        })
    }
}

fn decode(cursor: Option<&Cursor>) -> Result<Option<RecordId>, PaginationError> {
    cursor.map(CursorCodec::decode).transpose()
}
