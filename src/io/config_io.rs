use std::fs;
use std::path::{Path, PathBuf};

use crate::model::config::Config;

/// Error type for configuration problems. All of them are fatal.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("no API key set (use --api-key or TODOIST_API_KEY)")]
    MissingCredential,
    #[error("snapshot backend selected but no snapshot path given")]
    MissingSnapshotPath,
    #[error("label {0:?} doesn't exist, please create it")]
    MissingLabel(String),
    #[error("unknown time zone {0:?}")]
    InvalidTimezone(String),
}

/// `$XDG_CONFIG_HOME/cascade/config.toml`, falling back to `~/.config`.
pub fn default_config_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
    Some(base.join("cascade").join("config.toml"))
}

/// Load the config file. An explicit path must exist; the default location
/// is optional and yields the built-in defaults when absent.
pub fn load_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => match default_config_path() {
            Some(p) if p.exists() => p,
            _ => return Ok(Config::default()),
        },
    };
    let text = fs::read_to_string(&path).map_err(|e| ConfigError::Read {
        path: path.clone(),
        source: e,
    })?;
    parse_config(&text)
}

pub fn parse_config(text: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::config::Backend;
    use tempfile::TempDir;

    fn sample_config() -> &'static str {
        r#"[markers]
serial_suffix = ">>"
blocking_label = "Someday"
next_label_prefix = "Next"

[store]
backend = "snapshot"
snapshot_path = "tasks.json"

[run]
execute = true
interval_secs = 300
timezone = "Europe/Budapest"
"#
    }

    #[test]
    fn parses_full_config() {
        let config = parse_config(sample_config()).unwrap();
        assert_eq!(config.markers.serial_suffix, ">>");
        assert_eq!(config.markers.parallel_suffix, "(=)");
        assert_eq!(config.markers.blocking_label, "Someday");
        assert_eq!(config.markers.next_label_prefix.as_deref(), Some("Next"));
        assert_eq!(config.store.backend, Backend::Snapshot);
        assert_eq!(config.store.snapshot_path, Some(PathBuf::from("tasks.json")));
        assert!(config.run.execute);
        assert_eq!(config.run.interval_secs, Some(300));
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.markers.blocking_label, "NoDate");
        assert_eq!(config.markers.serial_suffix, "(-)");
        assert_eq!(config.store.backend, Backend::Todoist);
        assert!(!config.run.execute);
        assert!(config.run.interval_secs.is_none());
    }

    #[test]
    fn explicit_path_must_exist() {
        let tmp = TempDir::new().unwrap();
        let err = load_config(Some(&tmp.path().join("missing.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn load_from_explicit_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, sample_config()).unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.markers.blocking_label, "Someday");
    }

    #[test]
    fn bad_toml_is_a_parse_error() {
        let err = parse_config("[markers\nfoo").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
