use chrono::{DateTime, Utc};

/// `HH:MM:SS` in UTC, as shown in the save banner.
#[must_use]
pub fn format_time_of_day(value: DateTime<Utc>) -> String {
    value.format("%H:%M:%S").to_string()
}
