use std::collections::BTreeMap;
use std::sync::Arc;

use grader_core::model::{
    BatchRecord, ContentId, GradingSession, HighlightsView, ItemIndex, ItemMarkup, SessionData,
};

use crate::config::PersistenceConfig;
use crate::persistence::ItemRecords;
use crate::ports::{Collaborators, Control, MarkupSlot, non_empty_overrides};

/// Captures the live page into a persistable snapshot.
///
/// Pure read: no side effects and no network access.
#[derive(Clone)]
pub struct PayloadBuilder {
    records: ItemRecords,
    collaborators: Collaborators,
    config: Arc<PersistenceConfig>,
}

impl PayloadBuilder {
    #[must_use]
    pub fn new(
        records: ItemRecords,
        collaborators: Collaborators,
        config: Arc<PersistenceConfig>,
    ) -> Self {
        Self {
            records,
            collaborators,
            config,
        }
    }

    /// Build the snapshot, or `None` when there is nothing to persist.
    ///
    /// With `omit_markup` the cached fragments are left out.
    #[must_use]
    pub fn build(&self, omit_markup: bool) -> Option<GradingSession> {
        let snapshots = self.records.snapshots();
        let (items, batch_record) = match self.records.batch() {
            Some(batch) => (ItemIndex::range(batch.count()).collect::<Vec<_>>(), batch),
            None => {
                let items = self
                    .records
                    .legacy_contiguous_items(self.config.legacy_scan_limit);
                let batch = BatchRecord::from_snapshots(items.iter().filter_map(|i| snapshots.get(i)));
                if !items.is_empty() {
                    tracing::debug!(items = items.len(), "rebuilt batch record from item snapshots");
                }
                (items, batch)
            }
        };
        if items.is_empty() {
            return None;
        }

        let surface = &self.collaborators.surface;
        let active_tab = surface
            .active_tab()
            .unwrap_or_else(|| self.config.fallback_tab.clone());

        let markup = if omit_markup {
            BTreeMap::new()
        } else {
            items
                .iter()
                .filter_map(|&item| {
                    let markup = self.capture_markup(item);
                    (!markup.is_empty()).then_some((item, markup))
                })
                .collect()
        };

        let completed_flags = items
            .iter()
            .map(|&item| (item, surface.is_checked(Control::MarkComplete(item))))
            .collect();

        let remove_all_flags = items
            .iter()
            .flat_map(|&item| HighlightsView::ALL.map(|view| ContentId::new(view, item)))
            .filter(|&content| surface.is_checked(Control::RemoveAll(content)))
            .map(|content| (content, true))
            .collect();

        Some(GradingSession {
            active_tab,
            session_data: SessionData {
                batch_record: Some(batch_record),
                item_snapshots: snapshots,
                markup,
                score_overrides: non_empty_overrides(self.collaborators.scores.overrides()),
                completed_flags,
                remove_all_flags,
            },
        })
    }

    fn capture_markup(&self, item: ItemIndex) -> ItemMarkup {
        let surface = &self.collaborators.surface;
        let body = surface
            .markup(item, MarkupSlot::Body)
            .map(|fragment| fragment.html)
            .filter(|html| !self.config.is_placeholder(html));
        let highlights = |view| {
            surface
                .markup(item, MarkupSlot::Highlights(view))
                .filter(|fragment| fragment.populated && !fragment.html.trim().is_empty())
                .map(|fragment| fragment.html)
        };
        ItemMarkup {
            body,
            standalone_highlights: highlights(HighlightsView::Standalone),
            inline_highlights: highlights(HighlightsView::Inline),
        }
    }
}
