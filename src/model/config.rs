use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration from config.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub markers: Markers,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Marker strings matched against task, project and label names
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Markers {
    #[serde(default = "default_parallel_suffix")]
    pub parallel_suffix: String,
    #[serde(default = "default_serial_suffix")]
    pub serial_suffix: String,
    /// Name of the label that hides owned-but-inactive tasks
    #[serde(default = "default_blocking_label")]
    pub blocking_label: String,
    /// Labels whose name starts with this prefix suppress automatic due dates
    #[serde(default)]
    pub next_label_prefix: Option<String>,
    #[serde(default = "default_last_run_marker")]
    pub last_run_marker: String,
}

impl Default for Markers {
    fn default() -> Self {
        Markers {
            parallel_suffix: default_parallel_suffix(),
            serial_suffix: default_serial_suffix(),
            blocking_label: default_blocking_label(),
            next_label_prefix: None,
            last_run_marker: default_last_run_marker(),
        }
    }
}

fn default_parallel_suffix() -> String {
    "(=)".to_string()
}

fn default_serial_suffix() -> String {
    "(-)".to_string()
}

fn default_blocking_label() -> String {
    "NoDate".to_string()
}

fn default_last_run_marker() -> String {
    "$CascadeLastRun$".to_string()
}

/// Which task store to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Todoist,
    Snapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: Backend,
    /// JSON file used by the snapshot backend
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Never written back; prefer the TODOIST_API_KEY environment variable
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            backend: Backend::default(),
            snapshot_path: None,
            api_url: default_api_url(),
            api_key: None,
        }
    }
}

fn default_api_url() -> String {
    "https://api.todoist.com/sync/v9/sync".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    /// Commit staged changes; otherwise only log them
    #[serde(default)]
    pub execute: bool,
    /// Repeat the run with this many seconds between iterations
    #[serde(default)]
    pub interval_secs: Option<u64>,
    /// Overrides the store's user zone
    #[serde(default)]
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
