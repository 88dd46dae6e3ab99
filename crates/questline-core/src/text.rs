// Small text helpers for user-facing messages.

use chrono::{DateTime, FixedOffset, Utc};

/// Display offset applied when rendering instants into chat messages.
/// Storage and comparison stay in UTC.
const DISPLAY_OFFSET_SECS: i32 = 3 * 3600;

/// "1 point", "4 points"
pub fn pluralize(n: u32, singular: &str, plural: &str) -> String {
    if n == 1 {
        format!("{n} {singular}")
    } else {
        format!("{n} {plural}")
    }
}

/// Render an instant in the event-local display zone, e.g. "01 March 2025 16:00"
pub fn format_event_time(at: DateTime<Utc>) -> String {
    let offset = FixedOffset::east_opt(DISPLAY_OFFSET_SECS).expect("fixed display offset");
    at.with_timezone(&offset).format("%d %B %Y %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn pluralize_handles_singular_and_plural() {
        assert_eq!(pluralize(0, "point", "points"), "0 points");
        assert_eq!(pluralize(1, "point", "points"), "1 point");
        assert_eq!(pluralize(4, "point", "points"), "4 points");
    }

    #[test]
    fn event_times_render_in_the_display_zone() {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 13, 0, 0).unwrap();
        assert_eq!(format_event_time(at), "01 March 2025 16:00");
    }
}
