//! Saving and restoring the grading session.

mod guard;
mod listener;
mod payload;
mod reattach;
mod records;
mod restore;
mod scheduler;
mod service;

pub use guard::{RestoreGuard, RestoringToken};
pub use listener::{ContentEvent, spawn_change_listener};
pub use payload::PayloadBuilder;
pub use reattach::{HandlerReattacher, HandlerRegistry};
pub use records::ItemRecords;
pub use restore::{RestoreOrchestrator, RestoreReport};
pub use scheduler::{DropReason, SaveOutcome, SaveScheduler, SchedulerState};
pub use service::{ClearReport, SessionPersistence};
