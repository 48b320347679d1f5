//! The scheduler loop.
//!
//! [`Scheduler`] owns a background task that polls the [`JobStore`] for due
//! jobs every `poll_interval`, runs them one after another, and writes the
//! outcome back. Neither a failing job nor a failing tick stops the loop;
//! only [`Scheduler::stop`] does.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::clock::Clock;
use crate::domain::ScheduledJob;
use crate::error::{Result, TaskpulseError};
use crate::runner::{JobHandler, JobRunner};
use crate::scheduler::config::{SchedulerConfig, compute_next_due};
use crate::scheduler::tick::{JobOutcome, SchedulerStats, TickReport};
use crate::store::JobStore;

/// Lifecycle of the background loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Polling
    Running,
    /// Stop requested; the loop exits at its next tick boundary
    Stopping,
    /// Not polling
    Stopped,
}

impl SchedulerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchedulerState::Running => "running",
            SchedulerState::Stopping => "stopping",
            SchedulerState::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// State shared between the handle and the background task.
struct Shared {
    store: Arc<dyn JobStore>,
    runner: RwLock<JobRunner>,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
    state: Mutex<SchedulerState>,
    stats: Mutex<SchedulerStats>,
    stop_tx: watch::Sender<bool>,
}

/// Polls for due jobs and runs them.
pub struct Scheduler {
    shared: Arc<Shared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.shared.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Scheduler {
    /// Create a stopped scheduler.
    pub fn new(store: Arc<dyn JobStore>, runner: JobRunner, clock: Arc<dyn Clock>, config: SchedulerConfig) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                store,
                runner: RwLock::new(runner),
                clock,
                config,
                state: Mutex::new(SchedulerState::Stopped),
                stats: Mutex::new(SchedulerStats::new()),
                stop_tx,
            }),
            handle: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.shared.config
    }

    /// Register a handler. Takes effect from the next tick.
    pub fn register_job_handler(&self, job_type: impl Into<String>, handler: Arc<dyn JobHandler>) {
        self.shared
            .runner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .register(job_type, handler);
    }

    /// Register a synchronous closure as a handler.
    pub fn register_fn<F>(&self, job_type: impl Into<String>, f: F)
    where
        F: Fn(&ScheduledJob) -> eyre::Result<()> + Send + Sync + 'static,
    {
        self.shared
            .runner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .register_fn(job_type, f);
    }

    pub fn state(&self) -> SchedulerState {
        *lock(&self.shared.state)
    }

    pub fn stats(&self) -> SchedulerStats {
        *lock(&self.shared.stats)
    }

    /// Spawn the polling loop on the current Tokio runtime.
    ///
    /// A no-op while running. Fails if a previous loop is still stopping or
    /// if there is no runtime.
    pub fn start(&self) -> Result<()> {
        let mut state = lock(&self.shared.state);
        match *state {
            SchedulerState::Running => {
                log::debug!("Scheduler already running");
                return Ok(());
            }
            SchedulerState::Stopping => {
                return Err(TaskpulseError::InvalidState("scheduler is still stopping".to_string()));
            }
            SchedulerState::Stopped => {}
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| TaskpulseError::InvalidState(format!("no Tokio runtime: {}", e)))?;

        self.shared.stop_tx.send_replace(false);
        let stop_rx = self.shared.stop_tx.subscribe();
        let handle = runtime.spawn(run_loop(self.shared.clone(), stop_rx));
        *state = SchedulerState::Running;
        drop(state);

        *lock(&self.handle) = Some(handle);
        Ok(())
    }

    /// Ask the loop to stop. Safe to call any number of times.
    ///
    /// A job already running is allowed to finish; no new tick starts.
    pub fn stop(&self) {
        let mut state = lock(&self.shared.state);
        if *state == SchedulerState::Running {
            *state = SchedulerState::Stopping;
            self.shared.stop_tx.send_replace(true);
            log::info!("Scheduler stop requested");
        }
    }

    /// Wait for the background task to exit.
    pub async fn join(&self) {
        let handle = lock(&self.handle).take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                log::error!("Scheduler task ended abnormally: {}", e);
                *lock(&self.shared.state) = SchedulerState::Stopped;
            }
        }
    }

    /// Run one tick now, independent of the background loop.
    pub async fn tick(&self) -> Result<TickReport> {
        self.shared.tick().await
    }
}

/// Marks the scheduler stopped when the loop task ends, including by panic.
struct StoppedOnExit(Arc<Shared>);

impl Drop for StoppedOnExit {
    fn drop(&mut self) {
        *lock(&self.0.state) = SchedulerState::Stopped;
    }
}

async fn run_loop(shared: Arc<Shared>, mut stop_rx: watch::Receiver<bool>) {
    let _stopped = StoppedOnExit(shared.clone());
    tracing::info!(
        poll_interval_ms = shared.config.poll_interval.as_millis() as u64,
        batch_limit = shared.config.batch_limit,
        "Scheduler started"
    );

    loop {
        let stop_requested = *stop_rx.borrow();
        if stop_requested {
            break;
        }

        if let Err(e) = shared.tick().await {
            tracing::error!(error = %e, "Scheduler tick failed");
        }

        tokio::select! {
            _ = tokio::time::sleep(shared.config.poll_interval) => {}
            _ = stop_rx.changed() => {}
        }
    }

    tracing::info!("Scheduler stopped");
}

impl Shared {
    async fn tick(&self) -> Result<TickReport> {
        let result = self.run_tick().await;

        let mut stats = lock(&self.stats);
        match &result {
            Ok(report) => stats.tick(report),
            Err(_) => stats.tick_failed(),
        }
        result
    }

    async fn run_tick(&self) -> Result<TickReport> {
        let now = self.clock.now();
        let due = self.store.list_due(now, self.config.batch_limit).await?;

        let mut report = TickReport {
            fetched: due.len(),
            ..Default::default()
        };
        if due.is_empty() {
            log::debug!("No jobs due at {}", now);
            return Ok(report);
        }

        let runner = self.runner.read().unwrap_or_else(PoisonError::into_inner).clone();
        for job in &due {
            match self.execute_one(&runner, job).await {
                Ok(outcome) => report.record(&outcome),
                Err(e) => {
                    report.write_errors += 1;
                    tracing::error!(job_id = %job.job_id, error = %e, "Failed to record job outcome");
                }
            }
        }

        tracing::info!(
            fetched = report.fetched,
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            "Scheduler tick complete"
        );
        Ok(report)
    }

    /// Run one job and record the outcome.
    ///
    /// Handler errors and unrepresentable next due times become a `failed` job;
    /// only a failed write-back is returned as `Err`.
    async fn execute_one(&self, runner: &JobRunner, job: &ScheduledJob) -> Result<JobOutcome> {
        let started = self.clock.now();

        let result = match run_isolated(runner, job).await {
            Ok(()) => compute_next_due(job, self.clock.now()).map_err(|e| e.to_string()),
            Err(e) => Err(format!("{:#}", e)),
        };

        match result {
            Ok(next_due_at) => {
                if !self.store.mark_run_ok(&job.job_id, next_due_at, started).await? {
                    return Ok(skipped(job));
                }

                match next_due_at {
                    Some(at) => {
                        tracing::info!(job_id = %job.job_id, job_type = %job.job_type, next_due_at = %at, "Job rescheduled");
                        Ok(JobOutcome::Rescheduled(at))
                    }
                    None => {
                        tracing::info!(job_id = %job.job_id, job_type = %job.job_type, "Job completed");
                        Ok(JobOutcome::Completed)
                    }
                }
            }
            Err(error) => {
                tracing::error!(job_id = %job.job_id, job_type = %job.job_type, error = %error, "Job execution failed");
                if !self.store.mark_run_failed(&job.job_id, &error, started).await? {
                    return Ok(skipped(job));
                }
                Ok(JobOutcome::Failed(error))
            }
        }
    }
}

fn skipped(job: &ScheduledJob) -> JobOutcome {
    tracing::warn!(job_id = %job.job_id, job_type = %job.job_type, "Job left pending while running, outcome not recorded");
    JobOutcome::Skipped
}

/// Run the handler on its own task so a panic fails the job, not the loop.
async fn run_isolated(runner: &JobRunner, job: &ScheduledJob) -> eyre::Result<()> {
    let runner = runner.clone();
    let job = job.clone();

    match tokio::spawn(async move { runner.run(&job).await }).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(eyre::eyre!("job handler panicked")),
        Err(e) => Err(eyre::eyre!("job handler aborted: {}", e)),
    }
}
