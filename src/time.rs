//! Simulation time helpers.
//!
//! All times in this crate are `i64` milliseconds relative to a
//! caller-chosen epoch. Durations use the same unit.

/// Milliseconds per second.
pub const SECOND_MS: i64 = 1_000;
/// Milliseconds per minute.
pub const MINUTE_MS: i64 = 60 * SECOND_MS;
/// Milliseconds per hour.
pub const HOUR_MS: i64 = 60 * MINUTE_MS;

/// `n` seconds in milliseconds.
#[inline]
pub const fn seconds(n: i64) -> i64 {
    n * SECOND_MS
}

/// `n` minutes in milliseconds.
#[inline]
pub const fn minutes(n: i64) -> i64 {
    n * MINUTE_MS
}

/// `n` hours in milliseconds.
#[inline]
pub const fn hours(n: i64) -> i64 {
    n * HOUR_MS
}

/// Formats a millisecond timestamp as `HH:MM:SS` (hours may exceed 24).
pub fn format_hms(ms: i64) -> String {
    let sign = if ms < 0 { "-" } else { "" };
    let total = ms.abs() / SECOND_MS;
    format!(
        "{sign}{:02}:{:02}:{:02}",
        total / 3600,
        (total / 60) % 60,
        total % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units() {
        assert_eq!(minutes(10), 600_000);
        assert_eq!(hours(8), 8 * 60 * 60 * 1000);
        assert_eq!(seconds(1), 1000);
    }

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(0), "00:00:00");
        assert_eq!(format_hms(minutes(45)), "00:45:00");
        assert_eq!(format_hms(hours(26) + seconds(5)), "26:00:05");
        assert_eq!(format_hms(-minutes(1)), "-00:01:00");
    }
}
