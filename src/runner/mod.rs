//! Job handlers and the registry that dispatches to them.
//!
//! A [`JobHandler`] executes one job type. [`JobRunner`] maps `job_type`
//! strings to handlers; a job whose type has no handler fails with
//! [`TaskpulseError::HandlerNotFound`](crate::TaskpulseError::HandlerNotFound).

mod builtin;
mod registry;

use async_trait::async_trait;

use crate::domain::ScheduledJob;

pub use builtin::{NoopHandler, ReminderHandler};
pub use registry::JobRunner;

/// Executes jobs of one type.
///
/// Handlers may fail with any error; the scheduler records it on the job.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &ScheduledJob) -> eyre::Result<()>;
}

/// Adapts a plain closure into a [`JobHandler`].
pub struct FnHandler<F> {
    f: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&ScheduledJob) -> eyre::Result<()> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> JobHandler for FnHandler<F>
where
    F: Fn(&ScheduledJob) -> eyre::Result<()> + Send + Sync,
{
    async fn handle(&self, job: &ScheduledJob) -> eyre::Result<()> {
        (self.f)(job)
    }
}
