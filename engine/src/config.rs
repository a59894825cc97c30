//! Tracker configuration.
//!
//! Read from a JSON file passed with `--config`. Every field is optional;
//! missing fields take the defaults below. Runtime overrides arrive through
//! `setoption name <id> value <x>` and go through [`TrackerConfig::set_option`].

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::input::Key;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config at {path}: {message}")]
    Parse { path: String, message: String },

    #[error("unknown option '{0}'")]
    UnknownOption(String),

    #[error("invalid value '{value}' for option '{name}'")]
    InvalidValue { name: String, value: String },

    #[error("missing value for {0}")]
    MissingArgument(String),

    #[error("unknown argument '{0}'")]
    UnknownArgument(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackerConfig {
    /// Key that advances the turn.
    pub advance_key: Key,
    /// Maximum number of template search results.
    pub search_limit: usize,
    /// Worker threads of the reorder sync pool.
    pub sync_threads: usize,
    /// How long shutdown waits for in-flight reorder syncs.
    pub sync_timeout_ms: u64,
    /// Log filter used when `RUST_LOG` is unset.
    pub log_filter: String,
    /// JSON seed replacing the built-in demo table.
    pub seed_path: Option<PathBuf>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            advance_key: Key::Space,
            search_limit: 10,
            sync_threads: 1,
            sync_timeout_ms: 2000,
            log_filter: "info".to_string(),
            seed_path: None,
        }
    }
}

impl TrackerConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
            let path = error.path().to_string();
            ConfigError::Parse {
                path,
                message: error.into_inner().to_string(),
            }
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Builds the configuration from command-line arguments (program name
    /// excluded). Only `--config <path>` is recognized; without it the
    /// defaults apply.
    pub fn from_args(args: &[String]) -> Result<Self, ConfigError> {
        let mut config = None;
        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--config" => {
                    i += 1;
                    let path = args
                        .get(i)
                        .ok_or_else(|| ConfigError::MissingArgument("--config".to_string()))?;
                    config = Some(Self::load(Path::new(path))?);
                }
                other => return Err(ConfigError::UnknownArgument(other.to_string())),
            }
            i += 1;
        }
        Ok(config.unwrap_or_default())
    }

    pub fn sync_timeout(&self) -> Duration {
        Duration::from_millis(self.sync_timeout_ms)
    }

    /// Applies a `setoption` pair. Names match case-insensitively and accept
    /// both `SearchLimit` and `search_limit` spellings.
    pub fn set_option(&mut self, name: &str, value: Option<&str>) -> Result<(), ConfigError> {
        let key: String = name
            .chars()
            .filter(|c| *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        let value = value.unwrap_or("");
        let invalid = || ConfigError::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
        };
        match key.as_str() {
            "advancekey" => {
                if value.trim().is_empty() {
                    return Err(invalid());
                }
                self.advance_key = Key::from_name(value);
            }
            "searchlimit" => self.search_limit = value.parse::<usize>().map_err(|_| invalid())?,
            "syncthreads" => {
                self.sync_threads = value
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(invalid)?;
            }
            "synctimeoutms" | "synctimeout" => {
                self.sync_timeout_ms = value.parse::<u64>().map_err(|_| invalid())?;
            }
            "logfilter" => self.log_filter = value.to_string(),
            "seedpath" => {
                self.seed_path = (!value.is_empty()).then(|| PathBuf::from(value));
            }
            _ => return Err(ConfigError::UnknownOption(name.to_string())),
        }
        Ok(())
    }
}
