//! SQLite-backed job store.
//!
//! One row per job in `scheduled_jobs`, keyed by `job_id`. Timestamps are stored
//! as fixed-width RFC 3339 UTC text so `due_at <= ?` is a plain string range
//! scan over the `(status, due_at)` index.

use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::domain::{JobStatus, NewJob, ScheduleKind, ScheduledJob, truncate_error};
use crate::error::{Result, TaskpulseError};
use crate::store::{JobStore, check_storable, from_db_time, to_db_time};

/// Job store over a single SQLite connection.
///
/// `rusqlite::Connection` is not `Sync`, so it sits behind a `Mutex`; every
/// statement is short and never held across an await.
pub struct SqliteJobStore {
    db: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteJobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteJobStore").finish_non_exhaustive()
    }
}

impl SqliteJobStore {
    /// Open or create the database file at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let db = Connection::open(path)?;
        Self::init_schema(&db)?;
        Ok(Self { db: Mutex::new(db) })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory()?;
        Self::init_schema(&db)?;
        Ok(Self { db: Mutex::new(db) })
    }

    fn init_schema(db: &Connection) -> Result<()> {
        db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS scheduled_jobs (
                job_id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                job_type TEXT NOT NULL,
                schedule_kind TEXT NOT NULL,
                schedule_json TEXT,
                payload_json TEXT,
                status TEXT NOT NULL,
                due_at TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                run_count INTEGER NOT NULL DEFAULT 0,
                last_run_at TEXT,
                last_error TEXT,
                completed_at TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_scheduled_jobs_due ON scheduled_jobs(status, due_at);
            CREATE INDEX IF NOT EXISTS idx_scheduled_jobs_owner ON scheduled_jobs(owner_id, status);
            "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db.lock().map_err(|e| TaskpulseError::Storage(e.to_string()))
    }

    /// Explain why a conditional update touched no rows.
    ///
    /// `Ok(false)` means the job exists but is no longer pending.
    fn check_unchanged(db: &Connection, job_id: &str) -> Result<bool> {
        let status: Option<String> = db
            .query_row("SELECT status FROM scheduled_jobs WHERE job_id = ?1", [job_id], |row| row.get(0))
            .optional()?;

        match status {
            None => Err(TaskpulseError::JobNotFound(job_id.to_string())),
            Some(status) => {
                log::warn!("Skipping write-back for job {}: already {}", job_id, status);
                Ok(false)
            }
        }
    }

    fn fail_pending(db: &Connection, job_id: &str, error: &str, now: DateTime<Utc>) -> Result<bool> {
        let changed = db.execute(
            r#"
            UPDATE scheduled_jobs
            SET status = 'failed', last_run_at = ?1, run_count = run_count + 1,
                last_error = ?2, updated_at = ?1
            WHERE job_id = ?3 AND status = 'pending'
            "#,
            params![to_db_time(now), truncate_error(error), job_id],
        )?;

        if changed == 0 {
            return Self::check_unchanged(db, job_id);
        }
        Ok(true)
    }

    fn query_jobs(db: &Connection, sql: &str, params: impl rusqlite::Params) -> Result<Vec<ScheduledJob>> {
        let mut stmt = db.prepare(sql)?;
        let rows = stmt.query_map(params, RawJob::from_row)?;

        let mut jobs = Vec::new();
        for row in rows {
            jobs.push(row?.into_job()?);
        }
        Ok(jobs)
    }
}

/// Row as stored, before timestamp and JSON decoding.
struct RawJob {
    job_id: String,
    owner_id: String,
    job_type: String,
    schedule_kind: String,
    schedule_json: Option<String>,
    payload_json: Option<String>,
    status: String,
    due_at: String,
    created_at: String,
    updated_at: String,
    run_count: i64,
    last_run_at: Option<String>,
    last_error: Option<String>,
    completed_at: Option<String>,
}

impl RawJob {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            job_id: row.get("job_id")?,
            owner_id: row.get("owner_id")?,
            job_type: row.get("job_type")?,
            schedule_kind: row.get("schedule_kind")?,
            schedule_json: row.get("schedule_json")?,
            payload_json: row.get("payload_json")?,
            status: row.get("status")?,
            due_at: row.get("due_at")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            run_count: row.get("run_count")?,
            last_run_at: row.get("last_run_at")?,
            last_error: row.get("last_error")?,
            completed_at: row.get("completed_at")?,
        })
    }

    fn into_job(self) -> Result<ScheduledJob> {
        let status = JobStatus::parse(&self.status)
            .ok_or_else(|| TaskpulseError::Storage(format!("unknown job status {:?}", self.status)))?;

        Ok(ScheduledJob {
            job_id: self.job_id,
            owner_id: self.owner_id,
            job_type: self.job_type,
            schedule_kind: ScheduleKind::from(self.schedule_kind),
            schedule_params: decode_json(self.schedule_json.as_deref())?,
            payload: decode_json(self.payload_json.as_deref())?,
            status,
            due_at: from_db_time(&self.due_at)?,
            created_at: from_db_time(&self.created_at)?,
            updated_at: from_db_time(&self.updated_at)?,
            run_count: u32::try_from(self.run_count).unwrap_or(0),
            last_run_at: self.last_run_at.as_deref().map(from_db_time).transpose()?,
            last_error: self.last_error,
            completed_at: self.completed_at.as_deref().map(from_db_time).transpose()?,
        })
    }
}

fn decode_json(raw: Option<&str>) -> Result<serde_json::Value> {
    match raw {
        Some(text) if !text.trim().is_empty() => Ok(serde_json::from_str(text)?),
        _ => Ok(serde_json::Value::Object(Default::default())),
    }
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn create(&self, job: NewJob, now: DateTime<Utc>) -> Result<ScheduledJob> {
        let record = ScheduledJob::from_new(job, now);
        check_storable(record.due_at)?;
        let db = self.lock()?;

        let inserted = db.execute(
            r#"
            INSERT OR IGNORE INTO scheduled_jobs
            (job_id, owner_id, job_type, schedule_kind, schedule_json, payload_json,
             status, due_at, created_at, updated_at, run_count)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 0)
            "#,
            params![
                record.job_id,
                record.owner_id,
                record.job_type,
                record.schedule_kind.as_str(),
                serde_json::to_string(&record.schedule_params)?,
                serde_json::to_string(&record.payload)?,
                record.status.as_str(),
                to_db_time(record.due_at),
                to_db_time(record.created_at),
                to_db_time(record.updated_at),
            ],
        )?;

        if inserted == 0 {
            return Err(TaskpulseError::InvalidState(format!("job {} already exists", record.job_id)));
        }
        Ok(record)
    }

    async fn get(&self, job_id: &str) -> Result<Option<ScheduledJob>> {
        let db = self.lock()?;
        let raw = db
            .query_row("SELECT * FROM scheduled_jobs WHERE job_id = ?1", [job_id], RawJob::from_row)
            .optional()?;
        raw.map(RawJob::into_job).transpose()
    }

    async fn list_due(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<ScheduledJob>> {
        let db = self.lock()?;
        let mut jobs = Vec::new();
        let mut unreadable = Vec::new();

        {
            let mut stmt = db.prepare(
                r#"
                SELECT * FROM scheduled_jobs
                WHERE status = 'pending' AND due_at <= ?1
                ORDER BY due_at ASC, created_at ASC
                LIMIT ?2
                "#,
            )?;
            let rows = stmt.query_map(params![to_db_time(now), limit as i64], |row| {
                Ok((row.get::<_, String>("job_id")?, RawJob::from_row(row)))
            })?;

            for row in rows {
                let (job_id, raw) = row?;
                match raw.map_err(TaskpulseError::from).and_then(RawJob::into_job) {
                    Ok(job) => jobs.push(job),
                    Err(e) => unreadable.push((job_id, e)),
                }
            }
        }

        // One bad row must not block the rest of the table.
        for (job_id, e) in unreadable {
            log::error!("Failing unreadable job {}: {}", job_id, e);
            Self::fail_pending(&db, &job_id, &format!("unreadable job row: {}", e), now)?;
        }
        Ok(jobs)
    }

    async fn mark_run_ok(&self, job_id: &str, next_due_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Result<bool> {
        if let Some(next) = next_due_at {
            check_storable(next)?;
        }
        let db = self.lock()?;
        let now_text = to_db_time(now);

        let changed = match next_due_at {
            None => db.execute(
                r#"
                UPDATE scheduled_jobs
                SET status = 'done', completed_at = ?1, last_run_at = ?1,
                    run_count = run_count + 1, last_error = NULL, updated_at = ?1
                WHERE job_id = ?2 AND status = 'pending'
                "#,
                params![now_text, job_id],
            )?,
            Some(next) => db.execute(
                r#"
                UPDATE scheduled_jobs
                SET due_at = ?1, last_run_at = ?2,
                    run_count = run_count + 1, last_error = NULL, updated_at = ?2
                WHERE job_id = ?3 AND status = 'pending'
                "#,
                params![to_db_time(next), now_text, job_id],
            )?,
        };

        if changed == 0 {
            return Self::check_unchanged(&db, job_id);
        }
        Ok(true)
    }

    async fn mark_run_failed(&self, job_id: &str, error: &str, now: DateTime<Utc>) -> Result<bool> {
        let db = self.lock()?;
        Self::fail_pending(&db, job_id, error, now)
    }

    async fn cancel(&self, job_id: &str, now: DateTime<Utc>) -> Result<()> {
        let db = self.lock()?;
        let changed = db.execute(
            "UPDATE scheduled_jobs SET status = 'cancelled', updated_at = ?1 WHERE job_id = ?2 AND status = 'pending'",
            params![to_db_time(now), job_id],
        )?;

        if changed == 0 {
            let exists: Option<String> = db
                .query_row("SELECT job_id FROM scheduled_jobs WHERE job_id = ?1", [job_id], |row| row.get(0))
                .optional()?;
            if exists.is_none() {
                return Err(TaskpulseError::JobNotFound(job_id.to_string()));
            }
        }
        Ok(())
    }

    async fn list_pending_for_owner(&self, owner_id: &str, limit: usize) -> Result<Vec<ScheduledJob>> {
        let db = self.lock()?;
        Self::query_jobs(
            &db,
            r#"
            SELECT * FROM scheduled_jobs
            WHERE owner_id = ?1 AND status = 'pending'
            ORDER BY due_at ASC, created_at ASC
            LIMIT ?2
            "#,
            params![owner_id, limit as i64],
        )
    }
}
