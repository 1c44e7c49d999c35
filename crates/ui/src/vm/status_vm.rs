use grader_core::model::SaveStatus;

use crate::vm::time_fmt::format_time_of_day;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BannerTone {
    Busy,
    Success,
    Warning,
}

impl BannerTone {
    #[must_use]
    pub fn class(self) -> &'static str {
        match self {
            BannerTone::Busy => "session-banner--busy",
            BannerTone::Success => "session-banner--success",
            BannerTone::Warning => "session-banner--warning",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BannerVm {
    pub text: String,
    pub tone: BannerTone,
}

/// Banner content for a save status; `None` while idle.
#[must_use]
pub fn banner_for(status: SaveStatus) -> Option<BannerVm> {
    let (text, tone) = match status {
        SaveStatus::Idle => return None,
        SaveStatus::Saving => ("Saving session...".to_owned(), BannerTone::Busy),
        SaveStatus::Saved { at } => (
            format!("Session saved at {}", format_time_of_day(at)),
            BannerTone::Success,
        ),
        SaveStatus::FailedWillRetry => (
            "Could not save the session. Retrying shortly.".to_owned(),
            BannerTone::Warning,
        ),
        SaveStatus::Failed => (
            "Could not save the session. Your next edit will try again.".to_owned(),
            BannerTone::Warning,
        ),
        SaveStatus::Restored => ("Previous session restored".to_owned(), BannerTone::Success),
    };
    Some(BannerVm { text, tone })
}
