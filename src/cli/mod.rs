//! CLI module for taskpulse - command-line interface and subcommands.
//!
//! Provides the main entry point with subcommands for running the
//! scheduler, managing tasks and managing scheduled jobs.

pub mod commands;

pub use commands::Cli;
