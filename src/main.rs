use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use taskpulse::clock::{Clock, SystemClock};
use taskpulse::domain::{JobStatus, NewJob, ScheduleKind, ScheduledJob};
use taskpulse::priority::{RankOrder, rank_scored, render_title_with_priority};
use taskpulse::runner::JobRunner;
use taskpulse::scheduler::Scheduler;
use taskpulse::store::{JobStore, SqliteJobStore, SqliteTaskStore, TaskSource};

mod cli;
mod config;

use cli::Cli;
use cli::commands::{Commands, JobCommands, TaskCommands};
use config::Config;

fn setup_logging(level: Option<&str>) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taskpulse")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("taskpulse.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    // RUST_LOG wins over the configured level
    let env = env_logger::Env::default().default_filter_or(level.unwrap_or("info"));
    env_logger::Builder::from_env(env)
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
        println!("{} {}", "Database:".dimmed(), config.storage.db_path.display());
    }

    match &cli.command {
        Commands::Run => handle_run_command(config).await,
        Commands::Task { command } => handle_task_command(command, config).await,
        Commands::Job { command } => handle_job_command(command, config).await,
    }
}

fn open_job_store(config: &Config) -> Result<SqliteJobStore> {
    let path = &config.storage.db_path;
    SqliteJobStore::open(path).with_context(|| format!("Failed to open job store at {}", path.display()))
}

fn open_task_store(config: &Config) -> Result<SqliteTaskStore> {
    let path = &config.storage.db_path;
    SqliteTaskStore::open(path).with_context(|| format!("Failed to open task store at {}", path.display()))
}

async fn handle_run_command(config: &Config) -> Result<()> {
    let store = Arc::new(open_job_store(config)?);
    let runner = JobRunner::with_builtins();
    let scheduler_config = config.scheduler.to_scheduler_config();

    println!(
        "{} polling every {}s, handlers: {}",
        "Scheduler running:".green(),
        scheduler_config.poll_interval.as_secs(),
        runner.registered_types().join(", ")
    );

    let scheduler = Scheduler::new(store, runner, Arc::new(SystemClock), scheduler_config);
    scheduler.start().context("Failed to start scheduler")?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    println!("{}", "Stopping scheduler...".cyan());
    scheduler.stop();
    scheduler.join().await;

    let stats = scheduler.stats();
    info!("Scheduler finished: {:?}", stats);
    println!(
        "{} {} ticks, {} jobs ok, {} jobs failed, {} skipped, {} tick errors",
        "Stopped:".green(),
        stats.ticks,
        stats.jobs_succeeded,
        stats.jobs_failed,
        stats.jobs_skipped,
        stats.tick_errors
    );
    Ok(())
}

async fn handle_task_command(command: &TaskCommands, config: &Config) -> Result<()> {
    let store = open_task_store(config)?;
    let now = SystemClock.now();

    match command {
        TaskCommands::Add {
            text,
            owner,
            deadline,
            scheduled,
        } => {
            let task = store
                .add_task(owner, text, *deadline, *scheduled, now)
                .context("Failed to add task")?;
            println!(
                "{} [{}] {}",
                "Added:".green(),
                task.id,
                render_title_with_priority(&task.title, task.base_priority)
            );
        }
        TaskCommands::List { owner, urgent_first } => {
            let tasks = store.fetch_tasks(owner).await.context("Failed to load tasks")?;
            if tasks.is_empty() {
                println!("{}", "No tasks".dimmed());
                return Ok(());
            }

            let order = if *urgent_first {
                RankOrder::UrgentFirst
            } else {
                RankOrder::Ascending
            };
            for ranked in rank_scored(&tasks, now, order) {
                let task = &ranked.task;
                let mut line = format!(
                    "{:>5}  [{}] {}",
                    ranked.score,
                    task.id,
                    render_title_with_priority(&task.title, task.base_priority)
                );
                if let Some(deadline) = task.deadline_at {
                    line.push_str(&format!("  due {}", deadline.format("%Y-%m-%d %H:%M")));
                }
                if let Some(scheduled) = task.scheduled_at {
                    line.push_str(&format!("  at {}", scheduled.format("%Y-%m-%d %H:%M")));
                }
                println!("{}", line);
            }
        }
    }
    Ok(())
}

async fn handle_job_command(command: &JobCommands, config: &Config) -> Result<()> {
    let store = open_job_store(config)?;
    let now = SystemClock.now();

    match command {
        JobCommands::Add {
            job_type,
            due,
            every,
            owner,
            payload,
        } => {
            let due_at = due.resolve(now)?;
            let mut new_job = match every {
                Some(minutes) => NewJob::interval(owner.as_str(), job_type.as_str(), *minutes, due_at),
                None => NewJob::once(owner.as_str(), job_type.as_str(), due_at),
            };

            if let Some(raw) = payload {
                let value = serde_json::from_str(raw).context("Payload is not valid JSON")?;
                new_job = new_job.with_payload(value);
            }

            let job = store.create(new_job, now).await.context("Failed to create job")?;
            println!("{} {} due {}", "Scheduled:".green(), job.job_id, job.due_at.to_rfc3339());
        }
        JobCommands::List { owner, limit } => {
            let jobs = store
                .list_pending_for_owner(owner, *limit)
                .await
                .context("Failed to list jobs")?;
            if jobs.is_empty() {
                println!("{}", "No pending jobs".dimmed());
            }
            for job in &jobs {
                println!(
                    "{}  {:<10} {:<9} due {}",
                    job.job_id,
                    job.job_type,
                    describe_schedule(job),
                    job.due_at.format("%Y-%m-%d %H:%M:%S")
                );
            }
        }
        JobCommands::Show { id } => {
            let job = store
                .get(id)
                .await?
                .ok_or_else(|| eyre::eyre!("Job not found: {}", id))?;
            print_job(&job);
        }
        JobCommands::Cancel { id } => {
            store.cancel(id, now).await.context("Failed to cancel job")?;
            println!("{} {}", "Canceled:".red(), id);
        }
    }
    Ok(())
}

fn describe_schedule(job: &ScheduledJob) -> String {
    match (&job.schedule_kind, job.interval_minutes()) {
        (ScheduleKind::Interval, Some(minutes)) => format!("every {}m", minutes),
        (kind, _) => kind.to_string(),
    }
}

fn print_job(job: &ScheduledJob) {
    let status = match job.status {
        JobStatus::Pending => job.status.as_str().yellow(),
        JobStatus::Done => job.status.as_str().green(),
        JobStatus::Failed => job.status.as_str().red(),
        JobStatus::Cancelled => job.status.as_str().dimmed(),
    };

    println!("{} {}", "Job:".bold(), job.job_id);
    println!("  owner:     {}", job.owner_id);
    println!("  type:      {}", job.job_type);
    println!("  schedule:  {}", describe_schedule(job));
    println!("  status:    {}", status);
    println!("  due:       {}", job.due_at.to_rfc3339());
    println!("  runs:      {}", job.run_count);
    if let Some(last_run) = job.last_run_at {
        println!("  last run:  {}", last_run.to_rfc3339());
    }
    if let Some(completed) = job.completed_at {
        println!("  completed: {}", completed.to_rfc3339());
    }
    if let Some(error) = &job.last_error {
        println!("  error:     {}", error.red());
    }
    println!("  payload:   {}", job.payload);
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    // Setup logging
    setup_logging(config.log_level.as_deref()).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}
