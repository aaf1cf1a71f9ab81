use chrono::Utc;
use tracing::debug;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io::ConfigError;
use crate::io::{SnapshotStore, TaskStore, TodoistStore};
use crate::model::config::{Backend, Config};
use crate::ops::{RunError, Settings, Updater};

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let json = cli.json;
    let config = apply_overrides(config, &cli);

    match cli.command {
        None | Some(Commands::Run) => cmd_run(&config, json),
        Some(Commands::Plan) => cmd_plan(&config, json),
        Some(Commands::Dump) => cmd_dump(&config, json),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fold command-line flags over the loaded config. Flags win.
pub fn apply_overrides(mut config: Config, cli: &Cli) -> Config {
    if let Some(key) = &cli.api_key {
        config.store.api_key = Some(key.clone());
    }
    if let Some(path) = &cli.snapshot {
        config.store.backend = Backend::Snapshot;
        config.store.snapshot_path = Some(path.clone());
    }
    if let Some(label) = &cli.label {
        config.markers.blocking_label = label.clone();
    }
    if let Some(suffix) = &cli.parallel_suffix {
        config.markers.parallel_suffix = suffix.clone();
    }
    if let Some(suffix) = &cli.serial_suffix {
        config.markers.serial_suffix = suffix.clone();
    }
    if let Some(prefix) = &cli.next_label_prefix {
        config.markers.next_label_prefix = Some(prefix.clone());
    }
    if let Some(tz) = &cli.timezone {
        config.run.timezone = Some(tz.clone());
    }
    if cli.execute {
        config.run.execute = true;
    }
    if let Some(secs) = cli.periodical_sync_sec {
        config.run.interval_secs = Some(secs);
    }
    if cli.debug {
        config.log.level = "debug".to_string();
    }
    config
}

/// The store selected by `[store]`
pub fn open_store(config: &Config) -> Result<Box<dyn TaskStore>, RunError> {
    match config.store.backend {
        Backend::Snapshot => {
            let path = config
                .store
                .snapshot_path
                .as_ref()
                .ok_or(ConfigError::MissingSnapshotPath)?;
            debug!(path = %path.display(), "using snapshot store");
            Ok(Box::new(SnapshotStore::open(path.clone())))
        }
        Backend::Todoist => {
            let key = config
                .store
                .api_key
                .as_deref()
                .filter(|k| !k.is_empty())
                .ok_or(ConfigError::MissingCredential)?;
            debug!(url = %config.store.api_url, "using todoist store");
            Ok(Box::new(TodoistStore::new(&config.store.api_url, key)?))
        }
    }
}

fn connect(config: &Config) -> Result<Updater<Box<dyn TaskStore>>, Box<dyn std::error::Error>> {
    let settings = Settings::from_config(config)?;
    let store = open_store(config)?;
    Ok(Updater::connect(store, settings)?)
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_run(config: &Config, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut updater = connect(config)?;
    let report = updater.run();
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if let Some(error) = &report.error {
        println!("run skipped: {}", error);
    } else {
        let outcome = if report.committed {
            "committed"
        } else if report.changes > 0 {
            "not committed"
        } else {
            "nothing to do"
        };
        println!(
            "{} projects, {} changes, {}",
            report.projects, report.changes, outcome
        );
    }
    Ok(())
}

fn cmd_plan(config: &Config, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut updater = connect(config)?;
    let plans = updater.plan_at(Utc::now())?;
    if json {
        println!("{}", serde_json::to_string_pretty(&plans_to_json(&plans))?);
    } else {
        for line in format_plans(&plans) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_dump(config: &Config, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = open_store(config)?;
    let snapshot = store.fetch_all()?;
    if json {
        let out = DumpJson {
            project_count: snapshot.projects.len(),
            task_count: snapshot.tasks.len(),
            snapshot: &snapshot,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for line in format_dump(&snapshot) {
            println!("{}", line);
        }
    }
    Ok(())
}
