//! Domain types for taskpulse
//!
//! This module contains the records the core reads and writes:
//! - Task: A user's to-do item as consumed by ranking
//! - ScheduledJob: A time-triggered job advanced by the scheduler
//! - NewJob: Input for creating a ScheduledJob

pub mod job;
pub mod task;

pub use job::{JobStatus, MAX_ERROR_CHARS, NewJob, ScheduleKind, ScheduledJob, truncate_error};
pub use task::{Task, parse_timestamp};
