//! Storage contracts and implementations.
//!
//! The scheduler and listing code only talk to storage through two traits:
//! - [`JobStore`]: create, fetch, and advance scheduled jobs
//! - [`TaskSource`]: read-only access to a scope's tasks for ranking
//!
//! Two backends are provided: in-memory (tests, embedding) and SQLite.
//!
//! # Example
//!
//! ```ignore
//! use taskpulse::store::{JobStore, SqliteJobStore};
//!
//! let store = SqliteJobStore::open(Path::new("/tmp/taskpulse.db"))?;
//! store.create(NewJob::once("user-1", "reminder", due_at), now).await?;
//! let due = store.list_due(now, 25).await?;
//! ```

mod job_store;
mod memory;
mod task_store;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, SecondsFormat, Utc};

use crate::domain::{NewJob, ScheduledJob, Task};
use crate::error::{Result, TaskpulseError};

pub use job_store::SqliteJobStore;
pub use memory::{InMemoryJobStore, InMemoryTaskSource};
pub use task_store::SqliteTaskStore;

/// Persistent home of scheduled jobs.
///
/// Write-backs (`mark_run_ok`, `mark_run_failed`, `cancel`) only touch jobs that
/// are still pending; a job that went terminal in between is left alone and the
/// run write-backs report `false`.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new pending job. A due time outside [`check_storable`] is a `Storage` error.
    async fn create(&self, job: NewJob, now: DateTime<Utc>) -> Result<ScheduledJob>;

    /// Get a job by ID.
    async fn get(&self, job_id: &str) -> Result<Option<ScheduledJob>>;

    /// Pending jobs with `due_at <= now`, earliest first, at most `limit`.
    ///
    /// A row that cannot be decoded is marked failed and left out instead of
    /// failing the whole batch.
    async fn list_due(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<ScheduledJob>>;

    /// Record a successful run.
    ///
    /// `next_due_at = None` completes the job; otherwise it stays pending at the new due time.
    /// Returns whether the job was still pending and got updated.
    async fn mark_run_ok(&self, job_id: &str, next_due_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Result<bool>;

    /// Record a failed run. The job becomes `failed` and is not retried.
    /// Returns whether the job was still pending and got updated.
    async fn mark_run_failed(&self, job_id: &str, error: &str, now: DateTime<Utc>) -> Result<bool>;

    /// Cancel a job. A no-op for jobs that are already terminal.
    async fn cancel(&self, job_id: &str, now: DateTime<Utc>) -> Result<()>;

    /// Pending jobs of one owner, by due time then creation time.
    async fn list_pending_for_owner(&self, owner_id: &str, limit: usize) -> Result<Vec<ScheduledJob>>;
}

/// Read-only access to tasks for ranking.
#[async_trait]
pub trait TaskSource: Send + Sync {
    /// All open tasks of one owner, in no particular order.
    async fn fetch_tasks(&self, owner_id: &str) -> Result<Vec<Task>>;
}

/// Last year whose timestamps keep the fixed-width text form.
pub const MAX_STORED_YEAR: i32 = 9999;

/// Reject timestamps that cannot be stored and read back in due order.
///
/// Years past 9999 gain a `+` prefix and years before 0 a `-` prefix, which
/// breaks both parsing and the string comparison behind `list_due`.
pub fn check_storable(ts: DateTime<Utc>) -> Result<()> {
    if (0..=MAX_STORED_YEAR).contains(&ts.year()) {
        Ok(())
    } else {
        Err(TaskpulseError::Storage(format!(
            "timestamp {} is outside the storable range (years 0-{})",
            ts, MAX_STORED_YEAR
        )))
    }
}

/// Fixed-width UTC text form, so string order matches time order in SQL.
pub(crate) fn to_db_time(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn from_db_time(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| TaskpulseError::Storage(format!("bad stored timestamp {:?}: {}", raw, e)))
}
