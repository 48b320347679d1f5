//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - run: run the job scheduler in the foreground
//! - task: add and list ranked tasks
//! - job: add, list, inspect and cancel scheduled jobs

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use taskpulse::domain::parse_timestamp;

const DEFAULT_OWNER: &str = "local";

/// Largest minute count accepted on the command line (about a hundred years).
pub const MAX_MINUTES: i64 = 100 * 366 * 24 * 60;

/// Taskpulse - urgency-ranked tasks and a due-job scheduler
#[derive(Parser, Debug)]
#[command(name = "taskpulse")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the scheduler until interrupted
    Run,

    /// Task commands
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },

    /// Scheduled job commands
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },
}

/// Task subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum TaskCommands {
    /// Add a task; trailing '!'s raise its priority
    Add {
        /// Task text, e.g. "Pay rent!!"
        text: String,

        #[arg(short, long, default_value = DEFAULT_OWNER)]
        owner: String,

        /// Deadline (RFC 3339 or "YYYY-MM-DD HH:MM:SS", UTC)
        #[arg(short, long, value_parser = parse_time)]
        deadline: Option<DateTime<Utc>>,

        /// Planned start time (same formats as --deadline)
        #[arg(short, long, value_parser = parse_time)]
        scheduled: Option<DateTime<Utc>>,
    },

    /// List tasks in ranked order
    List {
        #[arg(short, long, default_value = DEFAULT_OWNER)]
        owner: String,

        /// Show the most urgent task first
        #[arg(short, long)]
        urgent_first: bool,
    },
}

/// When a new job first becomes due.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct DueArgs {
    /// Absolute due time
    #[arg(long, value_parser = parse_time)]
    pub due: Option<DateTime<Utc>>,

    /// Due this many minutes from now
    #[arg(long, value_parser = clap::value_parser!(i64).range(-MAX_MINUTES..=MAX_MINUTES))]
    pub in_minutes: Option<i64>,
}

impl DueArgs {
    /// First due time relative to `now`.
    pub fn resolve(&self, now: DateTime<Utc>) -> eyre::Result<DateTime<Utc>> {
        match (self.due, self.in_minutes) {
            (Some(at), _) => Ok(at),
            (None, Some(minutes)) => chrono::Duration::try_minutes(minutes)
                .and_then(|offset| now.checked_add_signed(offset))
                .ok_or_else(|| eyre::eyre!("--in-minutes {} is out of range", minutes)),
            (None, None) => eyre::bail!("either --due or --in-minutes is required"),
        }
    }
}

/// Job subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum JobCommands {
    /// Schedule a job
    Add {
        /// Job type, e.g. "reminder"
        job_type: String,

        #[command(flatten)]
        due: DueArgs,

        /// Repeat every N minutes after each successful run
        #[arg(short, long, value_parser = clap::value_parser!(i64).range(1..=MAX_MINUTES))]
        every: Option<i64>,

        #[arg(short, long, default_value = DEFAULT_OWNER)]
        owner: String,

        /// JSON payload handed to the handler
        #[arg(short, long)]
        payload: Option<String>,
    },

    /// List pending jobs
    List {
        #[arg(short, long, default_value = DEFAULT_OWNER)]
        owner: String,

        #[arg(short, long, default_value_t = 50)]
        limit: usize,
    },

    /// Show one job
    Show {
        /// Job ID
        id: String,
    },

    /// Cancel a job
    Cancel {
        /// Job ID
        id: String,
    },
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>, String> {
    parse_timestamp(raw).ok_or_else(|| format!("invalid timestamp: {}", raw))
}
