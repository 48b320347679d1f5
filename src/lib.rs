//! Taskpulse - the core of a personal task manager
//!
//! Two independent pieces share only the storage layer:
//! - [`priority`]: a pure urgency score (base priority plus a stepped deadline
//!   or scheduled-time boost) and the task ordering built on it.
//! - [`scheduler`]: a background loop that runs due jobs through a registry of
//!   handlers and moves each job to done, failed, or its next due time.

pub mod clock;
pub mod domain;
pub mod error;
pub mod id;
pub mod priority;
pub mod runner;
pub mod scheduler;
pub mod store;

pub use error::{Result, TaskpulseError};
