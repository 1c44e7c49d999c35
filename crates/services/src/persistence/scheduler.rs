use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use grader_core::Clock;
use grader_core::model::SaveStatus;
use storage::SessionStore;
use tokio::task::JoinHandle;

use crate::config::PersistenceConfig;
use crate::persistence::{PayloadBuilder, RestoreGuard};
use crate::status::StatusBoard;

/// Observable scheduler state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    PendingDebounce,
    Saving,
    PendingRetry,
}

/// Why an attempt was dropped without touching the network.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropReason {
    InFlight,
    Restoring,
}

/// Result of a single save attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    Failed,
    NothingToSave,
    Dropped(DropReason),
    /// The request finished after the session was cleared; its result was ignored.
    Discarded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AttemptKind {
    Debounced,
    Immediate,
    Retry,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TimerKind {
    Debounce,
    Retry,
}

struct ArmedTimer {
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct SchedulerFlags {
    pending_changes: bool,
    saving: bool,
    /// Bumped by `cancel_pending`; saves started under an older epoch report nothing.
    epoch: u64,
    generation: u64,
    debounce: Option<ArmedTimer>,
    retry: Option<ArmedTimer>,
    last_saved_at: Option<DateTime<Utc>>,
}

impl SchedulerFlags {
    fn slot(&mut self, kind: TimerKind) -> &mut Option<ArmedTimer> {
        match kind {
            TimerKind::Debounce => &mut self.debounce,
            TimerKind::Retry => &mut self.retry,
        }
    }

    fn cancel(&mut self, kind: TimerKind) {
        if let Some(timer) = self.slot(kind).take() {
            timer.handle.abort();
        }
    }
}

struct SchedulerInner {
    store: Arc<dyn SessionStore>,
    builder: PayloadBuilder,
    guard: RestoreGuard,
    status: StatusBoard,
    clock: Clock,
    config: Arc<PersistenceConfig>,
    flags: Mutex<SchedulerFlags>,
}

/// Debounces, de-duplicates and retries saves of the session snapshot.
///
/// Guards are cooperative: an attempt made while another save is in flight,
/// or while a restore holds the guard, is dropped rather than queued.
#[derive(Clone)]
pub struct SaveScheduler {
    inner: Arc<SchedulerInner>,
}

impl SaveScheduler {
    #[must_use]
    pub fn new(
        store: Arc<dyn SessionStore>,
        builder: PayloadBuilder,
        guard: RestoreGuard,
        status: StatusBoard,
        clock: Clock,
        config: Arc<PersistenceConfig>,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                store,
                builder,
                guard,
                status,
                clock,
                config,
                flags: Mutex::new(SchedulerFlags::default()),
            }),
        }
    }

    fn flags(&self) -> MutexGuard<'_, SchedulerFlags> {
        self.inner
            .flags
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn state(&self) -> SchedulerState {
        let flags = self.flags();
        if flags.saving {
            SchedulerState::Saving
        } else if flags.debounce.is_some() {
            SchedulerState::PendingDebounce
        } else if flags.retry.is_some() {
            SchedulerState::PendingRetry
        } else {
            SchedulerState::Idle
        }
    }

    #[must_use]
    pub fn has_pending_changes(&self) -> bool {
        self.flags().pending_changes
    }

    #[must_use]
    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.flags().last_saved_at
    }

    /// Record an edit and (re)start the quiet-period timer.
    ///
    /// Edits made while a restore is running are dropped.
    pub fn notify_change(&self) {
        if self.inner.guard.is_restoring() {
            tracing::debug!("change notification dropped during restore");
            return;
        }
        let mut flags = self.flags();
        flags.pending_changes = true;
        self.arm(&mut flags, TimerKind::Debounce, self.inner.config.debounce);
    }

    /// Cancel any pending debounce and save right away.
    pub async fn save_now(&self) -> SaveOutcome {
        self.flags().cancel(TimerKind::Debounce);
        self.attempt(AttemptKind::Immediate).await
    }

    /// Cancel both timers and forget pending changes.
    ///
    /// A save already in flight still reaches the store, but its outcome no
    /// longer updates the status or arms a retry.
    pub fn cancel_pending(&self) {
        let mut flags = self.flags();
        flags.cancel(TimerKind::Debounce);
        flags.cancel(TimerKind::Retry);
        flags.pending_changes = false;
        flags.epoch += 1;
    }

    fn arm(&self, flags: &mut SchedulerFlags, kind: TimerKind, delay: Duration) {
        flags.cancel(kind);
        flags.generation += 1;
        let generation = flags.generation;
        let this = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if !this.claim_timer(kind, generation) {
                return;
            }
            let attempt = match kind {
                TimerKind::Debounce => AttemptKind::Debounced,
                TimerKind::Retry => AttemptKind::Retry,
            };
            this.attempt(attempt).await;
        });
        *flags.slot(kind) = Some(ArmedTimer { generation, handle });
    }

    /// Clears the slot if it still holds this timer. After this returns true
    /// nothing can abort the running task.
    fn claim_timer(&self, kind: TimerKind, generation: u64) -> bool {
        let mut flags = self.flags();
        let slot = flags.slot(kind);
        let current = matches!(slot, Some(timer) if timer.generation == generation);
        if current {
            *slot = None;
        }
        current
    }

    async fn attempt(&self, kind: AttemptKind) -> SaveOutcome {
        let epoch = {
            let mut flags = self.flags();
            if self.inner.guard.is_restoring() {
                tracing::debug!(?kind, "save dropped: restore in progress");
                return SaveOutcome::Dropped(DropReason::Restoring);
            }
            if flags.saving {
                tracing::debug!(?kind, "save dropped: another save in flight");
                return SaveOutcome::Dropped(DropReason::InFlight);
            }
            flags.saving = true;
            flags.epoch
        };

        let Some(payload) = self.inner.builder.build(false) else {
            self.flags().saving = false;
            tracing::debug!(?kind, "nothing to save");
            return SaveOutcome::NothingToSave;
        };

        self.inner.status.publish(SaveStatus::Saving);
        let result = self.inner.store.save_session(&payload).await;

        let mut flags = self.flags();
        flags.saving = false;
        if flags.epoch != epoch {
            tracing::debug!(?kind, ok = result.is_ok(), "save finished after the session was cleared");
            return SaveOutcome::Discarded;
        }
        match result {
            Ok(()) => {
                let at = self.inner.clock.now();
                flags.pending_changes = false;
                flags.last_saved_at = Some(at);
                flags.cancel(TimerKind::Retry);
                self.inner.status.publish(SaveStatus::Saved { at });
                tracing::info!(?kind, "session saved");
                SaveOutcome::Saved
            }
            Err(err) => {
                let retry_armed = if kind == AttemptKind::Retry {
                    false
                } else {
                    if flags.retry.is_none() {
                        self.arm(&mut flags, TimerKind::Retry, self.inner.config.retry_delay);
                    }
                    true
                };
                if retry_armed {
                    self.inner.status.publish(SaveStatus::FailedWillRetry);
                } else {
                    self.inner.status.publish(SaveStatus::Failed);
                }
                tracing::warn!(?kind, error = %err, retry_armed, "session save failed");
                SaveOutcome::Failed
            }
        }
    }
}
