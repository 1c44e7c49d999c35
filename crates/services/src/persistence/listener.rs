use grader_core::model::ItemIndex;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::persistence::SaveScheduler;

/// Edits to the graded content that should eventually be persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentEvent {
    /// Text, a correction or a score changed. `None` when the edit is page-wide.
    Changed { item: Option<ItemIndex> },
    Removed { item: ItemIndex },
}

impl ContentEvent {
    #[must_use]
    pub fn item(&self) -> Option<ItemIndex> {
        match self {
            ContentEvent::Changed { item } => *item,
            ContentEvent::Removed { item } => Some(*item),
        }
    }
}

/// Forward content events to the scheduler until the sender side closes.
#[must_use = "dropping the handle does not stop the listener; abort it explicitly"]
pub fn spawn_change_listener(
    mut events: broadcast::Receiver<ContentEvent>,
    scheduler: SaveScheduler,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    tracing::trace!(item = ?event.item(), "content changed");
                    scheduler.notify_change();
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "change listener lagged; coalescing");
                    scheduler.notify_change();
                }
                Err(RecvError::Closed) => break,
            }
        }
        tracing::debug!("change listener stopped");
    })
}
