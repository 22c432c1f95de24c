use chrono::{DateTime, Duration, Utc};
use time_humanize::HumanTime;

/// Formats a duration as `HH:MM:SS`. Negative durations show as zero.
pub fn format_duration(elapsed: Duration) -> String {
    let total = elapsed.num_seconds().max(0);
    let (m, s) = (total / 60, total % 60);
    let (h, m) = (m / 60, m % 60);
    format!("{h:02}:{m:02}:{s:02}")
}

pub fn format_percent(value: f64) -> String {
    format!("{value:.1}%")
}

/// Signed percentage-point change, e.g. `+12.5` or `-3.0`
pub fn format_delta(delta: f64) -> String {
    if delta.abs() < 0.05 {
        "±0.0".to_string()
    } else {
        format!("{delta:+.1}")
    }
}

/// "3 days ago" style description of a past instant
pub fn humanize_since(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds().max(0);
    HumanTime::from_seconds(-secs).to_string()
}
