//! General time utility functions

use chrono;

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Sleep for a (possibly fractional) number of seconds.
///
/// Negative or non-finite durations are ignored.
pub fn sleep_s(duration_s: f64) {
    if duration_s.is_finite() && duration_s > 0.0 {
        std::thread::sleep(std::time::Duration::from_secs_f64(duration_s));
    }
}
