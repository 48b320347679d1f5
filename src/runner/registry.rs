//! Job type registry.

use std::collections::HashMap;
use std::sync::Arc;

use super::{FnHandler, JobHandler};
use crate::domain::ScheduledJob;
use crate::error::TaskpulseError;

/// Maps job types to handlers.
#[derive(Default, Clone)]
pub struct JobRunner {
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl std::fmt::Debug for JobRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRunner")
            .field("job_types", &self.registered_types())
            .finish()
    }
}

impl JobRunner {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `job_type`. A later registration replaces an earlier one.
    pub fn register(&mut self, job_type: impl Into<String>, handler: Arc<dyn JobHandler>) {
        let job_type = job_type.into();
        if self.handlers.insert(job_type.clone(), handler).is_some() {
            log::warn!("Replacing handler for job_type={}", job_type);
        }
    }

    /// Register a synchronous closure as the handler for `job_type`.
    pub fn register_fn<F>(&mut self, job_type: impl Into<String>, f: F)
    where
        F: Fn(&ScheduledJob) -> eyre::Result<()> + Send + Sync + 'static,
    {
        self.register(job_type, Arc::new(FnHandler::new(f)));
    }

    pub fn get(&self, job_type: &str) -> Option<Arc<dyn JobHandler>> {
        self.handlers.get(job_type).cloned()
    }

    pub fn has_handler(&self, job_type: &str) -> bool {
        self.handlers.contains_key(job_type)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered job types, sorted.
    pub fn registered_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.handlers.keys().map(|s| s.as_str()).collect();
        types.sort_unstable();
        types
    }

    /// Run `job` through the handler registered for its type.
    pub async fn run(&self, job: &ScheduledJob) -> eyre::Result<()> {
        let handler = self
            .get(&job.job_type)
            .ok_or_else(|| TaskpulseError::HandlerNotFound(job.job_type.clone()))?;
        handler.handle(job).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewJob;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn job(job_type: &str) -> ScheduledJob {
        ScheduledJob::from_new(NewJob::once("owner", job_type, Utc::now()), Utc::now())
    }

    #[test]
    fn test_new_is_empty() {
        let runner = JobRunner::new();
        assert!(runner.is_empty());
        assert_eq!(runner.len(), 0);
        assert!(runner.get("anything").is_none());
    }

    #[tokio::test]
    async fn test_run_dispatches_by_type() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();

        let mut runner = JobRunner::new();
        runner.register_fn("count", move |_job| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        runner.register_fn("other", |_job| Err(eyre::eyre!("wrong handler")));

        runner.run(&job("count")).await.unwrap();
        runner.run(&job("count")).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unknown_type_fails() {
        let runner = JobRunner::new();
        let err = runner.run(&job("mystery")).await.unwrap_err();
        assert_eq!(err.to_string(), "No runner registered for job_type=mystery");
        assert!(matches!(
            err.downcast_ref::<TaskpulseError>(),
            Some(TaskpulseError::HandlerNotFound(t)) if t == "mystery"
        ));
    }

    #[tokio::test]
    async fn test_register_replaces() {
        let mut runner = JobRunner::new();
        runner.register_fn("t", |_job| Err(eyre::eyre!("first")));
        runner.register_fn("t", |_job| Ok(()));

        assert_eq!(runner.len(), 1);
        assert!(runner.run(&job("t")).await.is_ok());
    }

    #[test]
    fn test_registered_types_sorted() {
        let mut runner = JobRunner::new();
        runner.register_fn("zeta", |_job| Ok(()));
        runner.register_fn("alpha", |_job| Ok(()));
        assert_eq!(runner.registered_types(), vec!["alpha", "zeta"]);
        assert!(runner.has_handler("alpha"));
        assert!(!runner.has_handler("beta"));
    }
}
