//! Per-tick results and cumulative counters.

use chrono::{DateTime, Utc};

/// What happened to one job in a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Handler succeeded and the job is done
    Completed,
    /// Handler succeeded and the job is pending again at this time
    Rescheduled(DateTime<Utc>),
    /// Handler failed; the job is now `failed`
    Failed(String),
    /// The job left `pending` while it ran (e.g. cancelled), so nothing was written
    Skipped,
}

/// Summary of one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Due jobs returned by the store
    pub fetched: usize,
    /// Jobs whose handler succeeded and whose outcome was recorded
    pub succeeded: usize,
    /// Jobs whose handler failed and whose failure was recorded
    pub failed: usize,
    /// Jobs that were no longer pending when their outcome was written back
    pub skipped: usize,
    /// Jobs whose outcome could not be written back; they stay pending
    pub write_errors: usize,
}

impl TickReport {
    pub fn is_empty(&self) -> bool {
        self.fetched == 0
    }

    /// Fold a recorded outcome into the report.
    pub fn record(&mut self, outcome: &JobOutcome) {
        match outcome {
            JobOutcome::Completed | JobOutcome::Rescheduled(_) => self.succeeded += 1,
            JobOutcome::Failed(_) => self.failed += 1,
            JobOutcome::Skipped => self.skipped += 1,
        }
    }
}

/// Counters since the scheduler was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Ticks that completed, including empty ones
    pub ticks: u64,
    /// Ticks that failed before running any job
    pub tick_errors: u64,
    pub jobs_succeeded: u64,
    pub jobs_failed: u64,
    pub jobs_skipped: u64,
    pub write_errors: u64,
}

impl SchedulerStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed tick.
    pub fn tick(&mut self, report: &TickReport) {
        self.ticks += 1;
        self.jobs_succeeded += report.succeeded as u64;
        self.jobs_failed += report.failed as u64;
        self.jobs_skipped += report.skipped as u64;
        self.write_errors += report.write_errors as u64;
    }

    /// Record a tick that errored out.
    pub fn tick_failed(&mut self) {
        self.tick_errors += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_record() {
        let mut report = TickReport {
            fetched: 3,
            ..Default::default()
        };
        report.record(&JobOutcome::Completed);
        report.record(&JobOutcome::Rescheduled(Utc::now()));
        report.record(&JobOutcome::Failed("boom".to_string()));
        report.record(&JobOutcome::Skipped);

        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.skipped, 1);
        assert!(!report.is_empty());
        assert!(TickReport::default().is_empty());
    }

    #[test]
    fn test_stats_accumulate() {
        let mut stats = SchedulerStats::new();
        stats.tick(&TickReport {
            fetched: 3,
            succeeded: 1,
            failed: 1,
            skipped: 1,
            write_errors: 0,
        });
        stats.tick(&TickReport::default());
        stats.tick_failed();

        assert_eq!(stats.ticks, 2);
        assert_eq!(stats.tick_errors, 1);
        assert_eq!(stats.jobs_succeeded, 1);
        assert_eq!(stats.jobs_failed, 1);
        assert_eq!(stats.jobs_skipped, 1);
    }
}
