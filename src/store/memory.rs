//! In-memory store implementations.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{JobStatus, NewJob, ScheduledJob, Task, truncate_error};
use crate::error::{Result, TaskpulseError};
use crate::store::{JobStore, TaskSource, check_storable};

/// Job store backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: Mutex<HashMap<String, ScheduledJob>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, ScheduledJob>>> {
        self.jobs.lock().map_err(|e| TaskpulseError::Storage(e.to_string()))
    }

    /// Snapshot of every job, ordered by creation time.
    pub fn list_all(&self) -> Result<Vec<ScheduledJob>> {
        let mut jobs: Vec<ScheduledJob> = self.lock()?.values().cloned().collect();
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.job_id.cmp(&b.job_id)));
        Ok(jobs)
    }

    /// Apply `update` to a pending job.
    ///
    /// Missing jobs are an error; terminal jobs are skipped and report `false`.
    fn update_pending(&self, job_id: &str, update: impl FnOnce(&mut ScheduledJob)) -> Result<bool> {
        let mut jobs = self.lock()?;
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| TaskpulseError::JobNotFound(job_id.to_string()))?;

        if job.status.is_terminal() {
            log::warn!("Skipping write-back for job {}: already {}", job_id, job.status);
            return Ok(false);
        }

        update(job);
        Ok(true)
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(&self, job: NewJob, now: DateTime<Utc>) -> Result<ScheduledJob> {
        let mut jobs = self.lock()?;
        if jobs.contains_key(&job.job_id) {
            return Err(TaskpulseError::InvalidState(format!("job {} already exists", job.job_id)));
        }
        check_storable(job.due_at)?;
        let record = ScheduledJob::from_new(job, now);
        jobs.insert(record.job_id.clone(), record.clone());
        Ok(record)
    }

    async fn get(&self, job_id: &str) -> Result<Option<ScheduledJob>> {
        Ok(self.lock()?.get(job_id).cloned())
    }

    async fn list_due(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<ScheduledJob>> {
        let mut due: Vec<ScheduledJob> = self.lock()?.values().filter(|j| j.is_due(now)).cloned().collect();
        due.sort_by(|a, b| {
            a.due_at
                .cmp(&b.due_at)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.job_id.cmp(&b.job_id))
        });
        due.truncate(limit);
        Ok(due)
    }

    async fn mark_run_ok(&self, job_id: &str, next_due_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Result<bool> {
        if let Some(next) = next_due_at {
            check_storable(next)?;
        }
        self.update_pending(job_id, |job| {
            match next_due_at {
                Some(next) => job.due_at = next,
                None => {
                    job.status = JobStatus::Done;
                    job.completed_at = Some(now);
                }
            }
            job.run_count += 1;
            job.last_run_at = Some(now);
            job.last_error = None;
            job.updated_at = now;
        })
    }

    async fn mark_run_failed(&self, job_id: &str, error: &str, now: DateTime<Utc>) -> Result<bool> {
        self.update_pending(job_id, |job| {
            job.status = JobStatus::Failed;
            job.run_count += 1;
            job.last_run_at = Some(now);
            job.last_error = Some(truncate_error(error));
            job.updated_at = now;
        })
    }

    async fn cancel(&self, job_id: &str, now: DateTime<Utc>) -> Result<()> {
        let mut jobs = self.lock()?;
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| TaskpulseError::JobNotFound(job_id.to_string()))?;

        if job.status == JobStatus::Pending {
            job.status = JobStatus::Cancelled;
            job.updated_at = now;
        }
        Ok(())
    }

    async fn list_pending_for_owner(&self, owner_id: &str, limit: usize) -> Result<Vec<ScheduledJob>> {
        let mut pending: Vec<ScheduledJob> = self
            .lock()?
            .values()
            .filter(|j| j.owner_id == owner_id && j.status == JobStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.due_at.cmp(&b.due_at).then_with(|| a.created_at.cmp(&b.created_at)));
        pending.truncate(limit);
        Ok(pending)
    }
}

/// Task source backed by a `Vec`, keyed by owner.
#[derive(Debug, Default)]
pub struct InMemoryTaskSource {
    tasks: Mutex<Vec<(String, Task)>>,
}

impl InMemoryTaskSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task under an owner.
    pub fn insert(&self, owner_id: impl Into<String>, task: Task) -> Result<()> {
        self.tasks
            .lock()
            .map_err(|e| TaskpulseError::Storage(e.to_string()))?
            .push((owner_id.into(), task));
        Ok(())
    }
}

#[async_trait]
impl TaskSource for InMemoryTaskSource {
    async fn fetch_tasks(&self, owner_id: &str) -> Result<Vec<Task>> {
        Ok(self
            .tasks
            .lock()
            .map_err(|e| TaskpulseError::Storage(e.to_string()))?
            .iter()
            .filter(|(owner, _)| owner == owner_id)
            .map(|(_, task)| task.clone())
            .collect())
    }
}
