//! Handlers shipped with the daemon.

use async_trait::async_trait;

use super::{JobHandler, JobRunner};
use crate::domain::ScheduledJob;
use std::sync::Arc;

/// Logs the reminder text from `payload.text`.
///
/// Delivery to the user is left to whatever notifier tails the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReminderHandler;

#[async_trait]
impl JobHandler for ReminderHandler {
    async fn handle(&self, job: &ScheduledJob) -> eyre::Result<()> {
        let text = job
            .payload
            .get("text")
            .and_then(|v| v.as_str())
            .ok_or_else(|| eyre::eyre!("reminder payload has no text"))?;

        tracing::info!(job_id = %job.job_id, owner_id = %job.owner_id, "Reminder: {}", text);
        Ok(())
    }
}

/// Does nothing. Useful for exercising schedules.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandler;

#[async_trait]
impl JobHandler for NoopHandler {
    async fn handle(&self, job: &ScheduledJob) -> eyre::Result<()> {
        log::debug!("noop job {}", job.job_id);
        Ok(())
    }
}

impl JobRunner {
    /// Registry preloaded with `reminder` and `noop`.
    pub fn with_builtins() -> Self {
        let mut runner = Self::new();
        runner.register("reminder", Arc::new(ReminderHandler));
        runner.register("noop", Arc::new(NoopHandler));
        runner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewJob;
    use chrono::Utc;

    #[tokio::test]
    async fn test_reminder_requires_text() {
        let now = Utc::now();
        let good = ScheduledJob::from_new(
            NewJob::once("u", "reminder", now).with_payload(serde_json::json!({ "text": "call mom" })),
            now,
        );
        let bad = ScheduledJob::from_new(NewJob::once("u", "reminder", now), now);

        assert!(ReminderHandler.handle(&good).await.is_ok());
        assert!(ReminderHandler.handle(&bad).await.is_err());
    }

    #[test]
    fn test_with_builtins() {
        let runner = JobRunner::with_builtins();
        assert_eq!(runner.registered_types(), vec!["noop", "reminder"]);
    }
}
