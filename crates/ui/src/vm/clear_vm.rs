use services::ClearReport;

/// How the last clear ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClearOutcome {
    Deleted,
    /// The page was reset but the saved copy is still on the server.
    LocalOnly,
}

/// Two-step confirm flow of the "clear session" control.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ClearState {
    #[default]
    Idle,
    Confirming,
    Clearing,
    Done(ClearOutcome),
}

impl ClearState {
    #[must_use]
    pub fn request(self) -> Self {
        match self {
            ClearState::Idle | ClearState::Done(_) => ClearState::Confirming,
            other => other,
        }
    }

    #[must_use]
    pub fn cancel(self) -> Self {
        match self {
            ClearState::Confirming => ClearState::Idle,
            other => other,
        }
    }

    /// Returns the next state if a clear should start now.
    #[must_use]
    pub fn begin(self) -> Option<Self> {
        (self == ClearState::Confirming).then_some(ClearState::Clearing)
    }

    #[must_use]
    pub fn finished(report: &ClearReport) -> Self {
        if report.deleted {
            ClearState::Done(ClearOutcome::Deleted)
        } else {
            ClearState::Done(ClearOutcome::LocalOnly)
        }
    }

    #[must_use]
    pub fn show_confirm(self) -> bool {
        matches!(self, ClearState::Confirming | ClearState::Clearing)
    }

    #[must_use]
    pub fn is_busy(self) -> bool {
        self == ClearState::Clearing
    }

    #[must_use]
    pub fn message(self) -> Option<&'static str> {
        match self {
            ClearState::Done(ClearOutcome::Deleted) => Some("Session cleared."),
            ClearState::Done(ClearOutcome::LocalOnly) => {
                Some("Page cleared, but the saved session could not be deleted.")
            }
            _ => None,
        }
    }
}
