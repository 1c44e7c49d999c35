use grader_core::model::SaveStatus;
use tokio::sync::watch;

/// Publishes the session banner state to whoever renders it.
#[derive(Clone, Debug)]
pub struct StatusBoard {
    tx: watch::Sender<SaveStatus>,
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusBoard {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SaveStatus::Idle);
        Self { tx }
    }

    pub fn publish(&self, status: SaveStatus) {
        self.tx.send_replace(status);
    }

    #[must_use]
    pub fn current(&self) -> SaveStatus {
        *self.tx.borrow()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.tx.subscribe()
    }
}
