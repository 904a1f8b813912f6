//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for catex using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// catex - categorical export engine
#[derive(Parser, Debug)]
#[command(name = "catex")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "catex.toml", env = "CATEX_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "CATEX_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one export job and write its artifact
    Export(commands::export::ExportArgs),

    /// Validate the configuration file and, optionally, a job definition
    ValidateConfig(commands::validate::ValidateArgs),

    /// Show the artifact flags of a job
    Status(commands::status::StatusArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
