use thiserror::Error;

use crate::model::{ContentIdError, SessionDataError};

/// Any domain-level failure of the grading model.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    SessionData(#[from] SessionDataError),
    #[error(transparent)]
    ContentId(#[from] ContentIdError),
}
