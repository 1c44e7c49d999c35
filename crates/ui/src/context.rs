use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use services::SessionPersistence;

/// Persistence handle shared with every component of the grading page.
///
/// The host page provides it with `use_context_provider` before mounting
/// [`SessionPanel`](crate::SessionPanel); `views::test_harness` does the same
/// over a headless page.
#[derive(Clone)]
pub struct PersistenceContext {
    persistence: SessionPersistence,
    restore_on_mount_once: Arc<AtomicBool>,
}

impl PersistenceContext {
    #[must_use]
    pub fn new(persistence: SessionPersistence, restore_on_mount: bool) -> Self {
        Self {
            persistence,
            restore_on_mount_once: Arc::new(AtomicBool::new(restore_on_mount)),
        }
    }

    #[must_use]
    pub fn persistence(&self) -> SessionPersistence {
        self.persistence.clone()
    }

    /// True exactly once if the page should restore the saved session on mount.
    #[must_use]
    pub fn take_restore_on_mount(&self) -> bool {
        self.restore_on_mount_once.swap(false, Ordering::AcqRel)
    }
}
