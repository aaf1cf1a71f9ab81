use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cascade", about = concat!("cascade v", env!("CARGO_PKG_VERSION"), " - serial and parallel task activation"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file (default: $XDG_CONFIG_HOME/cascade/config.toml)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Todoist API key
    #[arg(short = 'a', long = "api-key", env = "TODOIST_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Use a JSON snapshot file as the task store
    #[arg(long, global = true)]
    pub snapshot: Option<PathBuf>,

    /// Label that marks tasks taken without a due date
    #[arg(short = 'l', long, global = true)]
    pub label: Option<String>,

    /// Marker for parallel lists
    #[arg(long, global = true)]
    pub parallel_suffix: Option<String>,

    /// Marker for serial lists
    #[arg(long, global = true)]
    pub serial_suffix: Option<String>,

    /// Prefix of labels whose tasks never get an automatic due date
    #[arg(long, global = true)]
    pub next_label_prefix: Option<String>,

    /// Time zone for due dates (default: the store's user zone)
    #[arg(long, global = true)]
    pub timezone: Option<String>,

    /// Commit the changes; without this only log them
    #[arg(short = 'x', long, global = true)]
    pub execute: bool,

    /// Run every N seconds
    #[arg(short = 'p', long = "periodical-sync-sec", value_name = "SECS", global = true)]
    pub periodical_sync_sec: Option<u64>,

    /// Debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Activate tasks (the default when no subcommand is given)
    Run,
    /// Show the verdict tree without changing anything
    Plan,
    /// Print every project and task in the store
    Dump,
}
