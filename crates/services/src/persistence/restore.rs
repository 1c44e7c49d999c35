use std::sync::Arc;

use grader_core::model::{
    ContentId, GradingSession, HighlightsView, ItemIndex, ItemMarkup, SaveStatus,
};
use storage::SessionStore;

use crate::config::PersistenceConfig;
use crate::error::RestoreError;
use crate::persistence::{HandlerReattacher, ItemRecords, RestoreGuard};
use crate::ports::{Collaborators, Control, MarkupSlot};
use crate::status::StatusBoard;

/// Rewiring deferred until the injected markup has settled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Reattach {
    Item(ItemIndex),
    View(ContentId),
}

/// Counts of what a successful restore put back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub items: usize,
    pub replayed_bodies: usize,
    pub replayed_views: usize,
    pub overrides: usize,
}

/// Rebuilds the page from the last persisted snapshot.
#[derive(Clone)]
pub struct RestoreOrchestrator {
    store: Arc<dyn SessionStore>,
    records: ItemRecords,
    collaborators: Collaborators,
    reattacher: HandlerReattacher,
    guard: RestoreGuard,
    status: StatusBoard,
    config: Arc<PersistenceConfig>,
}

impl RestoreOrchestrator {
    #[must_use]
    pub fn new(
        store: Arc<dyn SessionStore>,
        records: ItemRecords,
        collaborators: Collaborators,
        reattacher: HandlerReattacher,
        guard: RestoreGuard,
        status: StatusBoard,
        config: Arc<PersistenceConfig>,
    ) -> Self {
        Self {
            store,
            records,
            collaborators,
            reattacher,
            guard,
            status,
            config,
        }
    }

    /// Fetch the persisted session and rebuild the page from it.
    ///
    /// Returns `false`, leaving the page blank, when there is no snapshot, the
    /// fetch fails, or the snapshot cannot be applied.
    pub async fn load_and_restore(&self) -> bool {
        let session = match self.store.fetch_session().await {
            Ok(Some(session)) => session,
            Ok(None) => {
                tracing::debug!("no persisted session");
                return false;
            }
            Err(err) => {
                tracing::warn!(error = %err, "session fetch failed; starting blank");
                return false;
            }
        };

        let Some(_token) = self.guard.acquire() else {
            tracing::warn!("restore already in progress");
            return false;
        };

        let jobs = match self.apply(&session) {
            Ok((report, jobs)) => {
                tracing::info!(
                    items = report.items,
                    bodies = report.replayed_bodies,
                    views = report.replayed_views,
                    overrides = report.overrides,
                    "session restored"
                );
                jobs
            }
            Err(err) => {
                tracing::warn!(error = %err, "session snapshot could not be applied");
                self.discard_partial();
                return false;
            }
        };

        self.collaborators.surface.settled().await;
        for job in jobs {
            let result = match job {
                Reattach::Item(item) => self.reattacher.reattach_item(item),
                Reattach::View(content) => self.reattacher.reattach_view(content),
            };
            if let Err(err) = result {
                tracing::warn!(?job, error = %err, "handler reattachment failed");
            }
        }
        true
    }

    fn apply(&self, session: &GradingSession) -> Result<(RestoreReport, Vec<Reattach>), RestoreError> {
        let Collaborators {
            surface,
            renderer,
            scores,
            ..
        } = &self.collaborators;
        let data = &session.session_data;

        surface.switch_tab(&session.active_tab)?;

        let batch = data
            .effective_batch(self.config.legacy_scan_limit)
            .ok_or(RestoreError::MissingBatch)?;
        renderer.render_skeleton(&batch, &self.records)?;
        self.records.apply_snapshots(&data.item_snapshots);

        let mut report = RestoreReport {
            items: batch.count(),
            ..RestoreReport::default()
        };
        let mut jobs = Vec::new();

        for (&item, markup) in &data.markup {
            if let Some(body) = &markup.body {
                surface.inject_markup(item, MarkupSlot::Body, body)?;
                jobs.push(Reattach::Item(item));
                report.replayed_bodies += 1;
            }
        }

        for (&item, markup) in &data.markup {
            for view in HighlightsView::ALL {
                let Some(html) = view_markup(markup, view) else {
                    continue;
                };
                surface.inject_markup(item, MarkupSlot::Highlights(view), html)?;
                surface.mark_populated(item, view)?;
                jobs.push(Reattach::View(ContentId::new(view, item)));
                report.replayed_views += 1;
            }
        }

        for (&content, &checked) in &data.remove_all_flags {
            surface.set_checked(Control::RemoveAll(content), checked)?;
        }

        for (&item, per_item) in &data.score_overrides {
            for (category, value) in per_item {
                scores.set_override(item, category, value.clone());
                surface.apply_score_input(item, category, value)?;
                report.overrides += 1;
            }
        }

        for (&item, &completed) in &data.completed_flags {
            surface.set_checked(Control::MarkComplete(item), completed)?;
        }

        surface.fit_text_areas(None);
        self.status.publish(SaveStatus::Restored);
        Ok((report, jobs))
    }

    /// Leave the page blank rather than half-restored.
    fn discard_partial(&self) {
        let bound = self.records.count() + self.config.legacy_scan_limit;
        self.records.purge(bound);
        self.collaborators.scores.clear();
        self.reattacher.registry().clear();
        self.collaborators.surface.clear_output();
        self.status.publish(SaveStatus::Idle);
    }
}

fn view_markup(markup: &ItemMarkup, view: HighlightsView) -> Option<&str> {
    match view {
        HighlightsView::Standalone => markup.standalone_highlights.as_deref(),
        HighlightsView::Inline => markup.inline_highlights.as_deref(),
    }
}
