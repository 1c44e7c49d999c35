use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use grader_core::model::{
    BatchEntry, BatchRecord, ContentId, ItemIndex, ItemSnapshot, SessionDataError,
    contiguous_indices,
};

#[derive(Default)]
struct RecordsState {
    batch: Option<BatchRecord>,
    items: BTreeMap<ItemIndex, ItemSnapshot>,
    count: usize,
    remove_all_preferences: BTreeMap<ContentId, bool>,
}

/// Keyed store of per-item records for the current page.
///
/// Owned by the persistence subsystem and handed to every collaborator that
/// reads or resets item state. Keeps an explicit item count next to the map.
#[derive(Clone, Default)]
pub struct ItemRecords {
    state: Arc<Mutex<RecordsState>>,
}

impl ItemRecords {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RecordsState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of items the page currently holds.
    #[must_use]
    pub fn count(&self) -> usize {
        self.lock().count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    #[must_use]
    pub fn get(&self, index: ItemIndex) -> Option<ItemSnapshot> {
        self.lock().items.get(&index).cloned()
    }

    #[must_use]
    pub fn snapshots(&self) -> BTreeMap<ItemIndex, ItemSnapshot> {
        self.lock().items.clone()
    }

    #[must_use]
    pub fn batch(&self) -> Option<BatchRecord> {
        self.lock().batch.clone()
    }

    /// Store an edited item without touching the batch record.
    pub fn update(&self, index: ItemIndex, snapshot: ItemSnapshot) {
        let mut state = self.lock();
        state.items.insert(index, snapshot);
        state.count = state.count.max(index.value() + 1);
    }

    /// Store a freshly computed item and extend the batch record with it.
    ///
    /// # Errors
    ///
    /// Returns `SessionDataError::NonContiguous` if `index` would leave a gap.
    pub fn record_computed(
        &self,
        index: ItemIndex,
        snapshot: ItemSnapshot,
    ) -> Result<(), SessionDataError> {
        let mut state = self.lock();
        let mut batch = state.batch.clone().unwrap_or_default();
        batch.set_entry(
            index,
            BatchEntry {
                original_input: snapshot.original_input.clone(),
                result: snapshot.result.clone(),
            },
        )?;
        state.batch = Some(batch);
        state.items.insert(index, snapshot);
        state.count = state.count.max(index.value() + 1);
        Ok(())
    }

    /// Replace everything with the pristine computed form of `batch`.
    pub fn reset_from_batch(&self, batch: &BatchRecord) {
        let mut state = self.lock();
        state.items = batch
            .entries()
            .iter()
            .enumerate()
            .map(|(i, entry)| (ItemIndex::new(i), ItemSnapshot::from(entry)))
            .collect();
        state.count = batch.count();
        state.batch = Some(batch.clone());
    }

    /// Overlay persisted snapshots onto the current records.
    pub fn apply_snapshots(&self, snapshots: &BTreeMap<ItemIndex, ItemSnapshot>) {
        let mut state = self.lock();
        for (index, snapshot) in snapshots {
            state.items.insert(*index, snapshot.clone());
            state.count = state.count.max(index.value() + 1);
        }
    }

    /// Items found by the legacy contiguous scan over snapshots, for pages
    /// that hold no batch record.
    #[must_use]
    pub fn legacy_contiguous_items(&self, limit: usize) -> Vec<ItemIndex> {
        let state = self.lock();
        contiguous_indices(|i| state.items.contains_key(&i), limit)
    }

    /// Remove every record with an index below `bound`, the batch record and
    /// the explicit count. Returns how many item records were removed.
    pub fn purge(&self, bound: usize) -> usize {
        let mut state = self.lock();
        let before = state.items.len();
        state.items.retain(|index, _| index.value() >= bound);
        state.batch = None;
        state.count = 0;
        state.remove_all_preferences.clear();
        before - state.items.len()
    }

    /// The user's explicit "remove all" choice for a highlights view, if any.
    #[must_use]
    pub fn remove_all_preference(&self, content: ContentId) -> Option<bool> {
        self.lock().remove_all_preferences.get(&content).copied()
    }

    pub fn set_remove_all_preference(&self, content: ContentId, checked: bool) {
        self.lock().remove_all_preferences.insert(content, checked);
    }
}
