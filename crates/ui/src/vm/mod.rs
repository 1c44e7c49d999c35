mod clear_vm;
mod status_vm;
mod time_fmt;

pub use clear_vm::{ClearOutcome, ClearState};
pub use status_vm::{BannerTone, BannerVm, banner_for};
pub use time_fmt::format_time_of_day;
