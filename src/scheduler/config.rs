//! Scheduler settings and next-due computation.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::domain::{ScheduleKind, ScheduledJob};
use crate::error::{Result, TaskpulseError};
use crate::store::{MAX_STORED_YEAR, check_storable};

/// Default time between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Default number of due jobs fetched per tick.
pub const DEFAULT_BATCH_LIMIT: usize = 25;

/// Configuration for the Scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Sleep between ticks.
    pub poll_interval: Duration,
    /// Maximum jobs fetched per tick.
    pub batch_limit: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            batch_limit: DEFAULT_BATCH_LIMIT,
        }
    }
}

impl SchedulerConfig {
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Set the batch size. Zero is raised to one.
    pub fn with_batch_limit(mut self, batch_limit: usize) -> Self {
        self.batch_limit = batch_limit.max(1);
        self
    }
}

/// Next due time after a successful run, or `None` if the job is finished.
///
/// - `once`: finished.
/// - `interval`: `now + minutes`; a missing or non-positive `minutes` finishes the job.
/// - anything else: finished. Calendar-style kinds are not supported yet.
///
/// An interval whose next due time overflows or cannot be stored is an
/// `InvalidSchedule` error; the scheduler marks such a job failed.
pub fn compute_next_due(job: &ScheduledJob, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
    match &job.schedule_kind {
        ScheduleKind::Once => Ok(None),
        ScheduleKind::Interval => {
            let minutes = job.interval_minutes().unwrap_or(0);
            if minutes <= 0 {
                log::warn!("Job {} has non-positive interval {}, completing it", job.job_id, minutes);
                return Ok(None);
            }
            let next = chrono::Duration::try_minutes(minutes)
                .and_then(|step| now.checked_add_signed(step))
                .ok_or_else(|| TaskpulseError::InvalidSchedule(format!("interval of {} minutes overflows", minutes)))?;
            check_storable(next).map_err(|_| {
                TaskpulseError::InvalidSchedule(format!(
                    "interval of {} minutes lands after year {}",
                    minutes, MAX_STORED_YEAR
                ))
            })?;
            Ok(Some(next))
        }
        ScheduleKind::Other(kind) => {
            log::warn!("Job {} has unsupported schedule kind {:?}, completing it", job.job_id, kind);
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewJob;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap()
    }

    fn job_with(kind: ScheduleKind, params: serde_json::Value) -> ScheduledJob {
        ScheduledJob::from_new(NewJob::once("u", "t", now()).with_schedule(kind, params), now())
    }

    #[test]
    fn test_config_default() {
        let config = SchedulerConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.batch_limit, 25);
    }

    #[test]
    fn test_config_builders() {
        let config = SchedulerConfig::default()
            .with_poll_interval(Duration::from_millis(50))
            .with_batch_limit(0);
        assert_eq!(config.poll_interval, Duration::from_millis(50));
        assert_eq!(config.batch_limit, 1);
    }

    #[test]
    fn test_once_completes() {
        assert_eq!(compute_next_due(&job_with(ScheduleKind::Once, json!({})), now()).unwrap(), None);
    }

    #[test]
    fn test_interval_advances_from_now() {
        let job = job_with(ScheduleKind::Interval, json!({ "minutes": 30 }));
        assert_eq!(compute_next_due(&job, now()).unwrap(), Some(now() + chrono::Duration::minutes(30)));
    }

    #[test]
    fn test_interval_accepts_string_minutes() {
        let job = job_with(ScheduleKind::Interval, json!({ "minutes": "15" }));
        assert_eq!(compute_next_due(&job, now()).unwrap(), Some(now() + chrono::Duration::minutes(15)));
    }

    #[test]
    fn test_non_positive_interval_completes() {
        for params in [json!({ "minutes": 0 }), json!({ "minutes": -5 }), json!({}), json!({ "minutes": "soon" })] {
            let job = job_with(ScheduleKind::Interval, params);
            assert_eq!(compute_next_due(&job, now()).unwrap(), None);
        }
    }

    #[test]
    fn test_unknown_kind_completes() {
        let job = job_with(ScheduleKind::from("cron"), json!({ "expr": "*/5 * * * *", "minutes": 5 }));
        assert_eq!(compute_next_due(&job, now()).unwrap(), None);
    }

    #[test]
    fn test_interval_overflow_is_an_error() {
        for minutes in [1_000_000_000_000_000_i64, i64::MAX, 5_000_000_000] {
            let job = job_with(ScheduleKind::Interval, json!({ "minutes": minutes }));
            let err = compute_next_due(&job, now()).unwrap_err();
            assert!(matches!(err, TaskpulseError::InvalidSchedule(_)), "minutes={}", minutes);
        }
    }

    #[test]
    fn test_interval_up_to_last_storable_year() {
        let last = Utc.with_ymd_and_hms(9999, 12, 31, 23, 0, 0).unwrap();
        let job = job_with(ScheduleKind::Interval, json!({ "minutes": 59 }));
        assert_eq!(compute_next_due(&job, last).unwrap(), Some(last + chrono::Duration::minutes(59)));

        let job = job_with(ScheduleKind::Interval, json!({ "minutes": 60 }));
        assert!(matches!(compute_next_due(&job, last), Err(TaskpulseError::InvalidSchedule(_))));
    }
}
