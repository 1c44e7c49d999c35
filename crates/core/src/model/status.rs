use chrono::{DateTime, Utc};

/// What the persistent session banner currently reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveStatus {
    #[default]
    Idle,
    Saving,
    Saved { at: DateTime<Utc> },
    /// The last save failed and a retry is scheduled.
    FailedWillRetry,
    /// The last save failed and nothing is scheduled; the next edit tries again.
    Failed,
    Restored,
}

impl SaveStatus {
    #[must_use]
    pub fn is_warning(&self) -> bool {
        matches!(self, SaveStatus::FailedWillRetry | SaveStatus::Failed)
    }
}
