use std::sync::Arc;

use grader_core::Clock;
use grader_core::model::{
    Category, ContentId, GradeResult, ItemIndex, ItemSnapshot, SaveStatus, ScoreOverride,
};
use storage::SessionStore;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::config::PersistenceConfig;
use crate::error::PersistenceError;
use crate::persistence::{
    ContentEvent, HandlerReattacher, HandlerRegistry, ItemRecords, PayloadBuilder,
    RestoreGuard, RestoreOrchestrator, SaveOutcome, SaveScheduler, spawn_change_listener,
};
use crate::ports::{Collaborators, Control, MarkupSlot};
use crate::status::StatusBoard;

/// What `clear_session` did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClearReport {
    /// Whether the remote snapshot was deleted.
    pub deleted: bool,
    /// Item records removed locally.
    pub purged: usize,
}

/// Entry point of the grading-session persistence subsystem.
///
/// Wires the record store, payload builder, scheduler, restore path and
/// handler reattachment around one session store and one set of UI
/// collaborators.
#[derive(Clone)]
pub struct SessionPersistence {
    store: Arc<dyn SessionStore>,
    records: ItemRecords,
    collaborators: Collaborators,
    reattacher: HandlerReattacher,
    scheduler: SaveScheduler,
    restorer: RestoreOrchestrator,
    status: StatusBoard,
    config: Arc<PersistenceConfig>,
}

impl SessionPersistence {
    #[must_use]
    pub fn new(
        store: Arc<dyn SessionStore>,
        collaborators: Collaborators,
        config: PersistenceConfig,
        clock: Clock,
    ) -> Self {
        let config = Arc::new(config);
        let records = ItemRecords::new();
        let guard = RestoreGuard::new();
        let status = StatusBoard::new();
        let reattacher = HandlerReattacher::new(
            Arc::clone(&collaborators.surface),
            Arc::clone(&collaborators.binder),
            HandlerRegistry::new(),
            records.clone(),
        );
        let builder = PayloadBuilder::new(
            records.clone(),
            collaborators.clone(),
            Arc::clone(&config),
        );
        let scheduler = SaveScheduler::new(
            Arc::clone(&store),
            builder,
            guard.clone(),
            status.clone(),
            clock,
            Arc::clone(&config),
        );
        let restorer = RestoreOrchestrator::new(
            Arc::clone(&store),
            records.clone(),
            collaborators.clone(),
            reattacher.clone(),
            guard,
            status.clone(),
            Arc::clone(&config),
        );
        Self {
            store,
            records,
            collaborators,
            reattacher,
            scheduler,
            restorer,
            status,
            config,
        }
    }

    #[must_use]
    pub fn records(&self) -> &ItemRecords {
        &self.records
    }

    #[must_use]
    pub fn scheduler(&self) -> &SaveScheduler {
        &self.scheduler
    }

    #[must_use]
    pub fn registry(&self) -> &HandlerRegistry {
        self.reattacher.registry()
    }

    #[must_use]
    pub fn status(&self) -> SaveStatus {
        self.status.current()
    }

    #[must_use]
    pub fn subscribe_status(&self) -> watch::Receiver<SaveStatus> {
        self.status.subscribe()
    }

    /// Rebuild the page from the persisted snapshot. See
    /// [`RestoreOrchestrator::load_and_restore`].
    pub async fn load_and_restore(&self) -> bool {
        self.restorer.load_and_restore().await
    }

    pub fn notify_change(&self) {
        self.scheduler.notify_change();
    }

    pub async fn save_now(&self) -> SaveOutcome {
        self.scheduler.save_now().await
    }

    /// Store a freshly computed item, render and wire it, then save at once.
    ///
    /// Recording an index again replaces its markup and rewires it against
    /// the new record.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError` if the index leaves a gap in the batch or
    /// the item cannot be rendered into the page.
    pub async fn record_result(
        &self,
        index: ItemIndex,
        original_input: &str,
        result: GradeResult,
    ) -> Result<SaveOutcome, PersistenceError> {
        let html = self.collaborators.renderer.render_item(original_input, &result);
        self.records
            .record_computed(index, ItemSnapshot::new(original_input, result))?;
        self.collaborators
            .surface
            .inject_markup(index, MarkupSlot::Body, &html)?;
        // A re-graded item gets fresh markup; nothing bound to the old body survives.
        self.reattacher.reattach_item(index)?;
        tracing::debug!(item = %index, "computed result recorded");
        Ok(self.scheduler.save_now().await)
    }

    /// Apply a manual score override and schedule a save.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::Surface` if the score input does not exist.
    pub fn override_score(
        &self,
        item: ItemIndex,
        category: &Category,
        value: ScoreOverride,
    ) -> Result<(), PersistenceError> {
        self.collaborators
            .surface
            .apply_score_input(item, category, &value)?;
        self.collaborators.scores.set_override(item, category, value);
        self.scheduler.notify_change();
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `PersistenceError::Surface` if the checkbox does not exist.
    pub fn mark_complete(&self, item: ItemIndex, completed: bool) -> Result<(), PersistenceError> {
        self.collaborators
            .surface
            .set_checked(Control::MarkComplete(item), completed)?;
        self.scheduler.notify_change();
        Ok(())
    }

    /// Record the user's "remove all" choice for a highlights view.
    ///
    /// The choice outlives re-renders of the view within this page.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::Surface` if the checkbox does not exist.
    pub fn set_remove_all(&self, content: ContentId, checked: bool) -> Result<(), PersistenceError> {
        self.collaborators
            .surface
            .set_checked(Control::RemoveAll(content), checked)?;
        self.records.set_remove_all_preference(content, checked);
        self.scheduler.notify_change();
        Ok(())
    }

    /// Delete the remote snapshot and reset the page, whether or not the
    /// delete succeeds.
    pub async fn clear_session(&self) -> ClearReport {
        self.scheduler.cancel_pending();

        let deleted = match self.store.delete_session().await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, "session delete failed; clearing locally");
                false
            }
        };

        let bound = self.records.count() + self.config.legacy_scan_limit;
        let purged = self.records.purge(bound);
        self.collaborators.scores.clear();
        self.reattacher.registry().clear();
        self.collaborators.surface.clear_output();
        self.status.publish(SaveStatus::Idle);
        tracing::info!(deleted, purged, "session cleared");

        ClearReport { deleted, purged }
    }

    /// Save on every content event received on `events`.
    #[must_use = "dropping the handle does not stop the listener; abort it explicitly"]
    pub fn listen(&self, events: broadcast::Receiver<ContentEvent>) -> JoinHandle<()> {
        spawn_change_listener(events, self.scheduler.clone())
    }
}
