use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::model::{Category, ContentId, ItemIndex, TabId};

/// Computed grading output for one item. Opaque to the persistence layer.
pub type GradeResult = Value;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionDataError {
    #[error("batch count ({count}) does not match entries ({entries})")]
    CountMismatch { count: usize, entries: usize },

    #[error("item {index} would leave a gap after {len} entries")]
    NonContiguous { index: usize, len: usize },
}

/// One `(original input, computed result)` pair of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEntry {
    pub original_input: String,
    pub result: GradeResult,
}

/// The authoritative ordered list of computed items.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawBatchRecord", into = "RawBatchRecord")]
pub struct BatchRecord {
    entries: Vec<BatchEntry>,
}

#[derive(Serialize, Deserialize)]
struct RawBatchRecord {
    entries: Vec<BatchEntry>,
    count: usize,
}

impl TryFrom<RawBatchRecord> for BatchRecord {
    type Error = SessionDataError;

    fn try_from(raw: RawBatchRecord) -> Result<Self, Self::Error> {
        if raw.count != raw.entries.len() {
            return Err(SessionDataError::CountMismatch {
                count: raw.count,
                entries: raw.entries.len(),
            });
        }
        Ok(Self {
            entries: raw.entries,
        })
    }
}

impl From<BatchRecord> for RawBatchRecord {
    fn from(batch: BatchRecord) -> Self {
        let count = batch.entries.len();
        Self {
            entries: batch.entries,
            count,
        }
    }
}

impl BatchRecord {
    #[must_use]
    pub fn new(entries: Vec<BatchEntry>) -> Self {
        Self { entries }
    }

    /// Rebuilds a batch from per-item snapshots taken in index order.
    pub fn from_snapshots<'a>(snapshots: impl IntoIterator<Item = &'a ItemSnapshot>) -> Self {
        Self {
            entries: snapshots
                .into_iter()
                .map(|snapshot| BatchEntry {
                    original_input: snapshot.original_input.clone(),
                    result: snapshot.result.clone(),
                })
                .collect(),
        }
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    #[must_use]
    pub fn entry(&self, index: ItemIndex) -> Option<&BatchEntry> {
        self.entries.get(index.value())
    }

    /// Replaces the entry at `index`, or appends it when `index == count`.
    ///
    /// # Errors
    ///
    /// Returns `SessionDataError::NonContiguous` if `index` is past the end.
    pub fn set_entry(&mut self, index: ItemIndex, entry: BatchEntry) -> Result<(), SessionDataError> {
        let len = self.entries.len();
        match index.value() {
            i if i < len => self.entries[i] = entry,
            i if i == len => self.entries.push(entry),
            i => return Err(SessionDataError::NonContiguous { index: i, len }),
        }
        Ok(())
    }
}

/// Per-item source of truth, including any edits made after computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSnapshot {
    pub result: GradeResult,
    pub original_input: String,
}

impl ItemSnapshot {
    #[must_use]
    pub fn new(original_input: impl Into<String>, result: GradeResult) -> Self {
        Self {
            result,
            original_input: original_input.into(),
        }
    }
}

impl From<&BatchEntry> for ItemSnapshot {
    fn from(entry: &BatchEntry) -> Self {
        Self {
            result: entry.result.clone(),
            original_input: entry.original_input.clone(),
        }
    }
}

/// Cached presentational fragments for one item.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemMarkup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standalone_highlights: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_highlights: Option<String>,
}

impl ItemMarkup {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.body.is_none() && self.standalone_highlights.is_none() && self.inline_highlights.is_none()
    }
}

/// A manual score override for one category of one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreOverride {
    pub points: f64,
    #[serde(default)]
    pub rationale: String,
}

impl ScoreOverride {
    #[must_use]
    pub fn new(points: f64, rationale: impl Into<String>) -> Self {
        Self {
            points,
            rationale: rationale.into(),
        }
    }
}

pub type ScoreOverrides = BTreeMap<ItemIndex, BTreeMap<Category, ScoreOverride>>;

/// Everything persisted for a session besides the active tab.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_record: Option<BatchRecord>,
    #[serde(default)]
    pub item_snapshots: BTreeMap<ItemIndex, ItemSnapshot>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub markup: BTreeMap<ItemIndex, ItemMarkup>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub score_overrides: ScoreOverrides,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub completed_flags: BTreeMap<ItemIndex, bool>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub remove_all_flags: BTreeMap<ContentId, bool>,
}

impl SessionData {
    /// Returns the batch record, or one rebuilt from the contiguous run of
    /// item snapshots for snapshots written without it.
    #[must_use]
    pub fn effective_batch(&self, scan_limit: usize) -> Option<BatchRecord> {
        if let Some(batch) = &self.batch_record {
            return Some(batch.clone());
        }
        let indices = contiguous_indices(|i| self.item_snapshots.contains_key(&i), scan_limit);
        if indices.is_empty() {
            return None;
        }
        Some(BatchRecord::from_snapshots(
            indices.iter().filter_map(|i| self.item_snapshots.get(i)),
        ))
    }
}

/// The full persisted envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingSession {
    pub active_tab: TabId,
    pub session_data: SessionData,
}

/// Legacy item discovery: walks indices from 0 and stops at the first gap
/// once at least one item has been found. Never probes past `limit`.
pub fn contiguous_indices(contains: impl Fn(ItemIndex) -> bool, limit: usize) -> Vec<ItemIndex> {
    let mut found = Vec::new();
    for index in ItemIndex::range(limit) {
        if contains(index) {
            found.push(index);
        } else if !found.is_empty() {
            break;
        }
    }
    found
}
