pub mod context;
pub mod views;
pub mod vm;

pub use context::PersistenceContext;
pub use views::{ClearSessionDialog, SessionPanel, StatusBanner};
