#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod headless;
pub mod persistence;
pub mod ports;
pub mod status;

pub use grader_core::Clock;

pub use config::PersistenceConfig;
pub use error::{PersistenceError, RestoreError, SurfaceError};
pub use headless::HeadlessSurface;
pub use persistence::{
    ClearReport, ContentEvent, DropReason, SaveOutcome, SaveScheduler, SchedulerState,
    SessionPersistence,
};
pub use ports::{
    BehaviorBinder, Collaborators, Control, MarkupFragment, MarkupSlot, ScoreRegistry,
    SkeletonRenderer, UiSurface,
};
pub use status::StatusBoard;
