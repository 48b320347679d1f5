//! Urgency score computation.
//!
//! A task's score is its base priority plus a time boost. The boost comes from
//! whichever of the deadline or the scheduled time is more pressing:
//! - Deadline: steps from +10 (72h+ away) up to +1000 (under 15 minutes or overdue)
//! - Scheduled: steps from +5 (72h+ away) up to +500, and stays at +500 once passed
//!
//! The two boosts are never added together; the larger one wins.

use chrono::{DateTime, Utc};

use crate::domain::{Task, parse_timestamp};

const MS_PER_MINUTE: i64 = 60_000;

/// A stepped boost schedule.
///
/// `buckets` are `(minimum minutes until target, boost)` pairs ordered from the
/// largest threshold to the smallest; the first bucket whose threshold is met wins.
/// `passed` applies once the target is in the past.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoostTable {
    pub buckets: [(i64, i64); 6],
    pub passed: i64,
}

/// Deadline boosts: 72h, 24h, 6h, 1h, 15min, 0.
pub const DEADLINE_BOOSTS: BoostTable = BoostTable {
    buckets: [(72 * 60, 10), (24 * 60, 50), (6 * 60, 200), (60, 500), (15, 800), (0, 1000)],
    passed: 1000,
};

/// Scheduled-time boosts: same thresholds, plateauing at 500.
pub const SCHEDULED_BOOSTS: BoostTable = BoostTable {
    buckets: [(72 * 60, 5), (24 * 60, 20), (6 * 60, 100), (60, 300), (15, 500), (0, 500)],
    passed: 500,
};

impl BoostTable {
    /// Boost for a target time, or 0 when there is none.
    pub fn boost(&self, target: Option<DateTime<Utc>>, now: DateTime<Utc>) -> i64 {
        let Some(target) = target else {
            return 0;
        };

        let until_ms = (target - now).num_milliseconds();
        if until_ms < 0 {
            return self.passed;
        }

        self.buckets
            .iter()
            .find(|(min_minutes, _)| until_ms >= min_minutes * MS_PER_MINUTE)
            .map(|(_, boost)| *boost)
            .unwrap_or(self.passed)
    }
}

/// Priority configuration (for customization).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityConfig {
    pub deadline: BoostTable,
    pub scheduled: BoostTable,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            deadline: DEADLINE_BOOSTS,
            scheduled: SCHEDULED_BOOSTS,
        }
    }
}

impl PriorityConfig {
    /// Calculate the score with this config.
    pub fn compute_priority(
        &self,
        base_priority: u8,
        scheduled_at: Option<DateTime<Utc>>,
        deadline_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> i64 {
        let deadline_boost = self.deadline.boost(deadline_at, now);
        let scheduled_boost = self.scheduled.boost(scheduled_at, now);
        i64::from(base_priority) + deadline_boost.max(scheduled_boost)
    }
}

/// Boost contributed by a deadline alone.
pub fn deadline_boost(deadline_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> i64 {
    DEADLINE_BOOSTS.boost(deadline_at, now)
}

/// Boost contributed by a scheduled time alone.
pub fn scheduled_boost(scheduled_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> i64 {
    SCHEDULED_BOOSTS.boost(scheduled_at, now)
}

/// Calculate the urgency score used as a sort key.
///
/// `base_priority + max(deadline_boost, scheduled_boost)`. Pure and total.
pub fn compute_priority(
    base_priority: u8,
    scheduled_at: Option<DateTime<Utc>>,
    deadline_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> i64 {
    PriorityConfig::default().compute_priority(base_priority, scheduled_at, deadline_at, now)
}

/// Same as [`compute_priority`], reading timestamps from stored text.
///
/// Unparseable timestamps contribute no boost.
pub fn compute_priority_raw(
    base_priority: u8,
    scheduled_at: Option<&str>,
    deadline_at: Option<&str>,
    now: DateTime<Utc>,
) -> i64 {
    compute_priority(
        base_priority,
        scheduled_at.and_then(parse_timestamp),
        deadline_at.and_then(parse_timestamp),
        now,
    )
}

/// Score a task.
pub fn task_priority(task: &Task, now: DateTime<Utc>) -> i64 {
    compute_priority(task.base_priority, task.scheduled_at, task.deadline_at, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 20, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_no_times_is_base_priority() {
        for base in 0..=5u8 {
            assert_eq!(compute_priority(base, None, None, now()), i64::from(base));
        }
    }

    #[test]
    fn test_overdue_deadline_is_max_boost() {
        for past in [Duration::seconds(1), Duration::hours(1), Duration::days(400)] {
            let deadline = now() - past;
            assert_eq!(compute_priority(2, None, Some(deadline), now()), 1002);
        }
    }

    #[test]
    fn test_deadline_step_boost() {
        let cases = [
            (Duration::hours(100), 10),
            (Duration::hours(50), 50),
            (Duration::hours(10), 200),
            (Duration::hours(3), 500),
            (Duration::minutes(30), 800),
            (Duration::minutes(5), 1000),
            (Duration::zero(), 1000),
        ];
        for (until, expected) in cases {
            assert_eq!(deadline_boost(Some(now() + until), now()), expected, "until={until}");
        }
    }

    #[test]
    fn test_scheduled_step_boost() {
        let cases = [
            (Duration::hours(100), 5),
            (Duration::hours(50), 20),
            (Duration::hours(10), 100),
            (Duration::hours(3), 300),
            (Duration::minutes(30), 500),
            (Duration::minutes(10), 500),
            (Duration::zero(), 500),
        ];
        for (until, expected) in cases {
            assert_eq!(scheduled_boost(Some(now() + until), now()), expected, "until={until}");
        }
    }

    #[test]
    fn test_scheduled_passed_is_flat() {
        for past in [Duration::seconds(1), Duration::hours(5), Duration::days(30)] {
            assert_eq!(scheduled_boost(Some(now() - past), now()), 500);
        }
    }

    #[test]
    fn test_threshold_boundaries_belong_to_bucket_starting_there() {
        let at = |d: Duration| deadline_boost(Some(now() + d), now());
        assert_eq!(at(Duration::hours(72)), 10);
        assert_eq!(at(Duration::hours(72) - Duration::milliseconds(1)), 50);
        assert_eq!(at(Duration::hours(24)), 50);
        assert_eq!(at(Duration::hours(6)), 200);
        assert_eq!(at(Duration::hours(1)), 500);
        assert_eq!(at(Duration::minutes(15)), 800);
        assert_eq!(at(Duration::minutes(15) - Duration::milliseconds(1)), 1000);
    }

    #[test]
    fn test_max_not_sum() {
        let deadline = now() + Duration::hours(3); // 500
        let scheduled = now() + Duration::minutes(30); // 500
        assert_eq!(compute_priority(0, Some(scheduled), Some(deadline), now()), 500);

        let deadline = now() + Duration::hours(100); // 10
        let scheduled = now() + Duration::hours(2); // 300
        assert_eq!(compute_priority(1, Some(scheduled), Some(deadline), now()), 301);
    }

    #[test]
    fn test_deadline_never_less_urgent_than_schedule() {
        let mut minutes = -120;
        while minutes <= 6000 {
            let target = Some(now() + Duration::minutes(minutes));
            assert!(deadline_boost(target, now()) >= scheduled_boost(target, now()), "minutes={minutes}");
            minutes += 7;
        }
    }

    #[test]
    fn test_monotone_as_deadline_recedes() {
        let deadline = now();
        let mut previous = i64::MAX;
        for minutes_before in (0..=6000).step_by(5) {
            let at = deadline - Duration::minutes(minutes_before);
            let score = compute_priority(0, None, Some(deadline), at);
            assert!(score <= previous, "minutes_before={minutes_before}");
            previous = score;
        }
    }

    #[test]
    fn test_spec_examples() {
        assert_eq!(compute_priority(0, None, None, now()), 0);
        assert_eq!(compute_priority(2, None, Some(now() - Duration::hours(1)), now()), 1002);
        assert_eq!(compute_priority(0, Some(now() + Duration::minutes(10)), None, now()), 500);
        assert_eq!(compute_priority(0, Some(now() + Duration::hours(10)), None, now()), 100);
    }

    #[test]
    fn test_raw_malformed_timestamps_are_absent() {
        assert_eq!(compute_priority_raw(3, Some("garbage"), Some("2026-99-99"), now()), 3);

        let deadline = (now() + Duration::hours(3)).to_rfc3339();
        assert_eq!(compute_priority_raw(3, Some("nope"), Some(&deadline), now()), 503);
    }

    #[test]
    fn test_task_priority() {
        let task = Task::new("t", "write report", 4, now()).with_deadline(now() + Duration::hours(30));
        assert_eq!(task_priority(&task, now()), 54);
    }

    #[test]
    fn test_custom_config() {
        let mut config = PriorityConfig::default();
        config.scheduled.passed = 900;
        let scheduled = Some(now() - Duration::minutes(1));
        assert_eq!(config.compute_priority(1, scheduled, None, now()), 901);
    }
}
