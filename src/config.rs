//! Engine-wide configuration (§4.10 of the design).
//!
//! `EngineConfig` is a conventional `serde`-deserializable settings struct:
//! construct one with [`EngineConfig::default`] and the builder setters, or
//! load one from a TOML file with [`EngineConfig::from_toml_str`] /
//! [`EngineConfig::from_file`] the way a job driver binary would. Per-
//! component overrides (name, parallelism, grouping) are not part of this
//! struct; they travel with the component itself, via
//! [`crate::graph::component::SourceSpec`] / [`crate::graph::component::OperatorSpec`],
//! per §6 of the design.

use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::queue::DEFAULT_QUEUE_CAPACITY;

/// Environment variable overriding [`EngineConfig::queue_capacity`].
pub const QUEUE_CAPACITY_ENV_VAR: &str = "CASCADE_QUEUE_CAPACITY";
/// Environment variable overriding [`EngineConfig::log_verbosity`].
pub const LOG_VERBOSITY_ENV_VAR: &str = "CASCADE_LOG_LEVEL";

/// Failures loading an [`EngineConfig`] from disk.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read `{path}`: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse `{path}`: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// The logging verbosity the engine asks its `log` backend to filter at
/// startup (§4.11 of the design). Not re-read after startup; there is no
/// runtime reconfiguration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogVerbosity {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Default for LogVerbosity {
    fn default() -> Self {
        LogVerbosity::Info
    }
}

impl LogVerbosity {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogVerbosity::Error => log::LevelFilter::Error,
            LogVerbosity::Warn => log::LevelFilter::Warn,
            LogVerbosity::Info => log::LevelFilter::Info,
            LogVerbosity::Debug => log::LevelFilter::Debug,
            LogVerbosity::Trace => log::LevelFilter::Trace,
        }
    }
}

impl std::str::FromStr for LogVerbosity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogVerbosity::Error),
            "warn" | "warning" => Ok(LogVerbosity::Warn),
            "info" => Ok(LogVerbosity::Info),
            "debug" => Ok(LogVerbosity::Debug),
            "trace" => Ok(LogVerbosity::Trace),
            other => Err(format!("unrecognised log verbosity `{other}`")),
        }
    }
}

/// Engine-wide defaults applied while [`crate::exec::StreamEngine::submit`]
/// materialises a job's physical topology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Capacity of every `EventQueue` created while wiring connections,
    /// unless a component-level override exists. Default 64 (§4.2, §6).
    pub queue_capacity: usize,
    /// Verbosity forwarded to the logging backend's filter at startup
    /// (§4.10, §4.11). The engine itself never initializes a backend; this
    /// is read by the job driver binary that does.
    pub log_verbosity: LogVerbosity,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            log_verbosity: LogVerbosity::default(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_log_verbosity(mut self, verbosity: LogVerbosity) -> Self {
        self.log_verbosity = verbosity;
        self
    }

    /// Parse a TOML document into an `EngineConfig`. Unspecified fields
    /// keep their [`Default`] value, same as every other config key this
    /// codebase loads from TOML.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Load an `EngineConfig` from a TOML file on disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_display = path.as_ref().display().to_string();
        let text = fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Read {
            path: path_display.clone(),
            source,
        })?;
        Self::from_toml_str(&text).map_err(|source| ConfigError::Parse {
            path: path_display,
            source,
        })
    }

    /// Apply `CASCADE_QUEUE_CAPACITY` / `CASCADE_LOG_LEVEL` environment
    /// variable overrides on top of whatever this config already holds,
    /// the same override order a job driver binary applies: file, then
    /// environment, then explicit builder calls.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(value) = env::var(QUEUE_CAPACITY_ENV_VAR) {
            match value.parse::<usize>() {
                Ok(capacity) => self.queue_capacity = capacity,
                Err(err) => log::warn!("ignoring invalid {QUEUE_CAPACITY_ENV_VAR}=`{value}`: {err}"),
            }
        }
        if let Ok(value) = env::var(LOG_VERBOSITY_ENV_VAR) {
            match value.parse::<LogVerbosity>() {
                Ok(verbosity) => self.log_verbosity = verbosity,
                Err(err) => log::warn!("ignoring invalid {LOG_VERBOSITY_ENV_VAR}=`{value}`: {err}"),
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_the_design_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.queue_capacity, 64);
        assert_eq!(config.log_verbosity, LogVerbosity::Info);
    }

    #[test]
    fn loads_overrides_from_toml() {
        let config = EngineConfig::from_toml_str("queue_capacity = 128\nlog_verbosity = \"debug\"\n").unwrap();
        assert_eq!(config.queue_capacity, 128);
        assert_eq!(config.log_verbosity, LogVerbosity::Debug);
    }

    #[test]
    fn missing_fields_keep_defaults() {
        let config = EngineConfig::from_toml_str("queue_capacity = 10\n").unwrap();
        assert_eq!(config.queue_capacity, 10);
        assert_eq!(config.log_verbosity, LogVerbosity::Info);
    }
}
