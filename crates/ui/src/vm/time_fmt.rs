use chrono::{DateTime, Utc};

use course_core::time::from_epoch_millis;

#[must_use]
pub fn format_datetime(value: DateTime<Utc>) -> String {
    value.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Format a report start time. Zero means the runner did not record one.
#[must_use]
pub fn format_epoch_millis(millis: i64) -> Option<String> {
    if millis <= 0 {
        return None;
    }
    from_epoch_millis(millis).map(format_datetime)
}
