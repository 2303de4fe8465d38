//! Human-readable time formatting
//!
//! Tracklist timestamps use a clock layout (`M:SS` under an hour, `H:MM:SS`
//! from an hour up). Durations in logs and headers use a compact unit layout.

const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_HOUR: u64 = 3600;

/// Format a position within a mix as a clock timestamp.
///
/// # Examples
///
/// ```
/// use mixid_common::human_time::format_timestamp;
///
/// assert_eq!(format_timestamp(0), "0:00");
/// assert_eq!(format_timestamp(330), "5:30");
/// assert_eq!(format_timestamp(3661), "1:01:01");
/// ```
pub fn format_timestamp(seconds: u64) -> String {
    let hours = seconds / SECONDS_PER_HOUR;
    let mins = (seconds % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE;
    let secs = seconds % SECONDS_PER_MINUTE;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{}:{:02}", mins, secs)
    }
}

/// Format a duration in seconds with units.
///
/// Fractions are rounded to the nearest second; negative or non-finite
/// values are reported as `unknown`.
///
/// # Examples
///
/// ```
/// use mixid_common::human_time::format_duration;
///
/// assert_eq!(format_duration(45.0), "45s");
/// assert_eq!(format_duration(125.4), "2m 05s");
/// assert_eq!(format_duration(3725.0), "1h 02m 05s");
/// assert_eq!(format_duration(f64::NAN), "unknown");
/// ```
pub fn format_duration(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "unknown".to_string();
    }

    let total = seconds.round() as u64;
    let hours = total / SECONDS_PER_HOUR;
    let mins = (total % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE;
    let secs = total % SECONDS_PER_MINUTE;

    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {:02}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}
