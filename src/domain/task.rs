//! Task records as consumed by ranking.
//!
//! Timestamps arrive from storage as text. Anything that does not parse is
//! treated as absent rather than rejected, since it only affects display order.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::priority::bang::clamp_priority;

/// A task as seen by the priority engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    /// Opaque unique identifier
    pub id: String,

    /// Display title (without priority bangs)
    pub title: String,

    /// User-assigned priority, always in [0, 5]
    pub base_priority: u8,

    /// Hard deadline
    pub deadline_at: Option<DateTime<Utc>>,

    /// Planned start time
    pub scheduled_at: Option<DateTime<Utc>>,

    /// Tie-break key: older tasks sort first among equals
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Create a task with no deadline or schedule.
    ///
    /// `base_priority` is clamped into [0, 5].
    pub fn new(id: impl Into<String>, title: impl Into<String>, base_priority: i64, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            base_priority: clamp_priority(base_priority),
            deadline_at: None,
            scheduled_at: None,
            created_at,
        }
    }

    /// Set the deadline.
    pub fn with_deadline(mut self, deadline_at: DateTime<Utc>) -> Self {
        self.deadline_at = Some(deadline_at);
        self
    }

    /// Set the scheduled time.
    pub fn with_scheduled(mut self, scheduled_at: DateTime<Utc>) -> Self {
        self.scheduled_at = Some(scheduled_at);
        self
    }

    /// Set both times from raw stored text; unparseable values become `None`.
    pub fn with_raw_times(mut self, deadline_at: Option<&str>, scheduled_at: Option<&str>) -> Self {
        self.deadline_at = deadline_at.and_then(parse_timestamp);
        self.scheduled_at = scheduled_at.and_then(parse_timestamp);
        self
    }
}

/// Parse a stored timestamp into UTC.
///
/// Accepts RFC 3339 with `Z` or an offset, and naive ISO-8601 forms (with `T`
/// or a space separator), which are taken to be UTC. Returns `None` on anything else.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }

    log::debug!("Ignoring unparseable timestamp: {:?}", raw);
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, h, m, 0).unwrap()
    }

    #[test]
    fn test_parse_rfc3339_zulu() {
        assert_eq!(parse_timestamp("2026-03-10T12:30:00Z"), Some(ts(12, 30)));
    }

    #[test]
    fn test_parse_rfc3339_offset_normalized_to_utc() {
        assert_eq!(parse_timestamp("2026-03-10T14:30:00+02:00"), Some(ts(12, 30)));
    }

    #[test]
    fn test_parse_naive_is_utc() {
        assert_eq!(parse_timestamp("2026-03-10T12:30:00"), Some(ts(12, 30)));
        assert_eq!(parse_timestamp("2026-03-10 12:30:00.250").map(|d| d.timestamp()), Some(ts(12, 30).timestamp()));
        assert_eq!(parse_timestamp("2026-03-10T12:30"), Some(ts(12, 30)));
    }

    #[test]
    fn test_parse_garbage_is_none() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("   "), None);
        assert_eq!(parse_timestamp("tomorrow-ish"), None);
        assert_eq!(parse_timestamp("2026-13-45T99:00:00Z"), None);
    }

    #[test]
    fn test_new_clamps_priority() {
        assert_eq!(Task::new("1", "a", 9, ts(0, 0)).base_priority, 5);
        assert_eq!(Task::new("2", "b", -3, ts(0, 0)).base_priority, 0);
        assert_eq!(Task::new("3", "c", 3, ts(0, 0)).base_priority, 3);
    }

    #[test]
    fn test_with_raw_times_drops_malformed() {
        let task = Task::new("1", "a", 0, ts(0, 0)).with_raw_times(Some("not a date"), Some("2026-03-10T12:30:00Z"));
        assert_eq!(task.deadline_at, None);
        assert_eq!(task.scheduled_at, Some(ts(12, 30)));
    }
}
