//! Scheduled job records
//!
//! A ScheduledJob is a time-triggered unit of work. The scheduler picks it up
//! once `due_at` has passed, runs it through the registered handler, and either
//! retires it or pushes `due_at` forward.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::id::generate_job_id;

/// Longest `last_error` text kept on a failed job.
pub const MAX_ERROR_CHARS: usize = 2000;

/// Status of a scheduled job
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Waiting for `due_at`
    Pending,
    /// Finished; will not run again
    Done,
    /// Handler failed; needs an operator to re-enqueue
    Failed,
    /// Cancelled externally
    Cancelled,
}

impl JobStatus {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    /// Parse a stored status string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "done" => Some(JobStatus::Done),
            "failed" => Some(JobStatus::Failed),
            "cancelled" => Some(JobStatus::Cancelled),
            _ => None,
        }
    }

    /// Check if this status represents a terminal state
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a job recurs.
///
/// Kinds this build does not understand are preserved verbatim so they
/// round-trip through storage; the scheduler retires them after one run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ScheduleKind {
    /// Runs once, then completes
    Once,
    /// Re-runs every `minutes` (from the schedule params)
    Interval,
    /// Anything else (cron, rrule, ...)
    Other(String),
}

impl ScheduleKind {
    pub fn as_str(&self) -> &str {
        match self {
            ScheduleKind::Once => "once",
            ScheduleKind::Interval => "interval",
            ScheduleKind::Other(kind) => kind,
        }
    }
}

impl From<String> for ScheduleKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "once" => ScheduleKind::Once,
            "interval" => ScheduleKind::Interval,
            _ => ScheduleKind::Other(s),
        }
    }
}

impl From<&str> for ScheduleKind {
    fn from(s: &str) -> Self {
        ScheduleKind::from(s.to_string())
    }
}

impl From<ScheduleKind> for String {
    fn from(kind: ScheduleKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A persisted time-triggered job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduledJob {
    /// Caller-generated unique id
    pub job_id: String,

    /// Owning user or context
    pub owner_id: String,

    /// Tag resolved by the runner registry
    pub job_type: String,

    /// Recurrence kind
    pub schedule_kind: ScheduleKind,

    /// Kind-specific data; `interval` reads `minutes`
    pub schedule_params: Value,

    /// Opaque data for the handler
    pub payload: Value,

    pub status: JobStatus,

    /// When the job becomes eligible to run
    pub due_at: DateTime<Utc>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// Execution attempts, successful or not; never decreases
    pub run_count: u32,

    pub last_run_at: Option<DateTime<Utc>>,

    /// Set only on failure, truncated to MAX_ERROR_CHARS
    pub last_error: Option<String>,

    /// Set when status becomes Done
    pub completed_at: Option<DateTime<Utc>>,
}

impl ScheduledJob {
    /// Build the initial pending record for a new job.
    pub fn from_new(new: NewJob, now: DateTime<Utc>) -> Self {
        Self {
            job_id: new.job_id,
            owner_id: new.owner_id,
            job_type: new.job_type,
            schedule_kind: new.schedule_kind,
            schedule_params: new.schedule_params,
            payload: new.payload,
            status: JobStatus::Pending,
            due_at: new.due_at,
            created_at: now,
            updated_at: now,
            run_count: 0,
            last_run_at: None,
            last_error: None,
            completed_at: None,
        }
    }

    /// Whether the scheduler may pick this job up at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::Pending && self.due_at <= now
    }

    /// The `minutes` schedule parameter, if present and numeric.
    ///
    /// Accepts integers, floats (truncated) and numeric strings.
    pub fn interval_minutes(&self) -> Option<i64> {
        match self.schedule_params.get("minutes")? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Input for creating a job.
#[derive(Debug, Clone, PartialEq)]
pub struct NewJob {
    pub job_id: String,
    pub owner_id: String,
    pub job_type: String,
    pub schedule_kind: ScheduleKind,
    pub schedule_params: Value,
    pub payload: Value,
    pub due_at: DateTime<Utc>,
}

impl NewJob {
    /// A one-shot job.
    pub fn once(owner_id: impl Into<String>, job_type: impl Into<String>, due_at: DateTime<Utc>) -> Self {
        Self {
            job_id: generate_job_id(),
            owner_id: owner_id.into(),
            job_type: job_type.into(),
            schedule_kind: ScheduleKind::Once,
            schedule_params: Value::Object(Default::default()),
            payload: Value::Object(Default::default()),
            due_at,
        }
    }

    /// A job that re-runs every `minutes`, first at `first_due_at`.
    pub fn interval(
        owner_id: impl Into<String>,
        job_type: impl Into<String>,
        minutes: i64,
        first_due_at: DateTime<Utc>,
    ) -> Self {
        let mut job = Self::once(owner_id, job_type, first_due_at);
        job.schedule_kind = ScheduleKind::Interval;
        job.schedule_params = serde_json::json!({ "minutes": minutes });
        job
    }

    /// Override the generated id.
    pub fn with_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = job_id.into();
        self
    }

    /// Attach a handler payload.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// Use an arbitrary schedule kind and params.
    pub fn with_schedule(mut self, kind: ScheduleKind, params: Value) -> Self {
        self.schedule_kind = kind;
        self.schedule_params = params;
        self
    }
}

/// Cut an error message down to MAX_ERROR_CHARS characters.
pub fn truncate_error(error: &str) -> String {
    error.chars().take(MAX_ERROR_CHARS).collect()
}
