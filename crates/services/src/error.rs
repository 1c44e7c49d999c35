//! Shared error types for the services crate.

use thiserror::Error;

use grader_core::model::SessionDataError;

/// Errors a UI collaborator reports when it cannot apply or read a value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SurfaceError {
    #[error("no rendered element for {0}")]
    MissingElement(String),
    #[error("unknown tab: {0}")]
    UnknownTab(String),
    #[error("render failed: {0}")]
    Render(String),
}

/// Errors emitted while applying a persisted snapshot.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RestoreError {
    #[error("snapshot has neither a batch record nor item snapshots")]
    MissingBatch,
    #[error(transparent)]
    Malformed(#[from] SurfaceError),
}

/// Errors emitted by `SessionPersistence` entry points.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PersistenceError {
    #[error(transparent)]
    SessionData(#[from] SessionDataError),
    #[error(transparent)]
    Surface(#[from] SurfaceError),
}
