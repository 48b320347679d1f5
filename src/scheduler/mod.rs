//! Background scheduler for time-triggered jobs.
//!
//! This module provides:
//! - **SchedulerConfig**: poll interval and batch size.
//! - **compute_next_due**: when a job runs next after a successful run, if ever.
//! - **Scheduler**: a polling loop that fetches due jobs, runs them through a
//!   [`JobRunner`](crate::runner::JobRunner) and writes the outcome back.
//!
//! # Architecture
//!
//! The scheduler uses a polling model:
//! 1. Every `poll_interval`, fetch up to `batch_limit` pending jobs that are due
//! 2. Run each one in turn; a failing job is marked `failed` and the batch moves on
//! 3. Successful jobs are completed or pushed to their next due time
//! 4. A failed tick (store unreachable) is logged and retried on the next poll
//!
//! # Example
//!
//! ```ignore
//! use taskpulse::scheduler::{Scheduler, SchedulerConfig};
//!
//! let scheduler = Scheduler::new(store, runner, Arc::new(SystemClock), SchedulerConfig::default());
//! scheduler.start()?;
//! // ...
//! scheduler.stop();
//! scheduler.join().await;
//! ```

mod config;
mod manager;
mod tick;

pub use config::{DEFAULT_BATCH_LIMIT, DEFAULT_POLL_INTERVAL, SchedulerConfig, compute_next_due};
pub use manager::{Scheduler, SchedulerState};
pub use tick::{JobOutcome, SchedulerStats, TickReport};
