use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared "restore in progress" flag the save path consults.
#[derive(Clone, Debug, Default)]
pub struct RestoreGuard {
    restoring: Arc<AtomicBool>,
}

impl RestoreGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_restoring(&self) -> bool {
        self.restoring.load(Ordering::Acquire)
    }

    /// Take the guard. Returns `None` if a restore already holds it.
    ///
    /// The guard is released when the returned token is dropped.
    #[must_use]
    pub fn acquire(&self) -> Option<RestoringToken> {
        self.restoring
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RestoringToken {
                restoring: Arc::clone(&self.restoring),
            })
    }
}

/// Held for the duration of a restore.
#[derive(Debug)]
pub struct RestoringToken {
    restoring: Arc<AtomicBool>,
}

impl Drop for RestoringToken {
    fn drop(&mut self) {
        self.restoring.store(false, Ordering::Release);
    }
}
