mod ids;
mod session;
mod status;

pub use ids::{Category, ContentId, ContentIdError, HighlightsView, ItemIndex, TabId};
pub use session::{
    BatchEntry, BatchRecord, GradeResult, GradingSession, ItemMarkup, ItemSnapshot, ScoreOverride,
    ScoreOverrides, SessionData, SessionDataError, contiguous_indices,
};
pub use status::SaveStatus;
