mod clear_session;
mod session_panel;
mod status_banner;

pub use clear_session::ClearSessionDialog;
pub use session_panel::{SessionPanel, SessionPanelState, SessionPanelView, use_session_panel};
pub use status_banner::StatusBanner;

#[cfg(test)]
mod test_harness;
#[cfg(test)]
mod view_smoke;
