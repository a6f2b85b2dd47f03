//! Engine configuration.
//!
//! # Responsibility
//! - Describe where records live, how many workers run and how logging is
//!   set up.
//! - Read those settings from `REQGRAPH_*` environment variables.
//!
//! # Invariants
//! - `worker_threads >= 1` for every config this module produces.
//! - `log_level` is always one of `trace|debug|info|warn|error`.

use crate::logging::{default_log_level, normalize_level};
use crate::store::{GraphStore, MemoryGraphStore, SqliteGraphStore, StoreResult};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::sync::Arc;

pub const ENV_DB_PATH: &str = "REQGRAPH_DB_PATH";
pub const ENV_WORKERS: &str = "REQGRAPH_WORKERS";
pub const ENV_LOG_LEVEL: &str = "REQGRAPH_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "REQGRAPH_LOG_DIR";

const DEFAULT_WORKER_THREADS: usize = 4;
const MEMORY_DB_PATH: &str = ":memory:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Worker count is not a positive integer.
    InvalidWorkerCount(String),
    /// Log level is not recognized.
    InvalidLogLevel(String),
    /// Log directory is not absolute.
    InvalidLogDir(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidWorkerCount(raw) => write!(
                f,
                "{ENV_WORKERS} must be a positive integer, got `{raw}`"
            ),
            Self::InvalidLogLevel(raw) => write!(
                f,
                "{ENV_LOG_LEVEL} must be trace|debug|info|warn|error, got `{raw}`"
            ),
            Self::InvalidLogDir(raw) => {
                write!(f, "{ENV_LOG_DIR} must be an absolute path, got `{raw}`")
            }
        }
    }
}

impl Error for ConfigError {}

/// Backend that holds graph records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    /// SQLite database file, created on first open.
    File(PathBuf),
    /// Process-local map; contents vanish with the process.
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub database: DatabaseTarget,
    pub worker_threads: usize,
    pub log_level: String,
    /// Directory for rolling log files. `None` leaves logging uninitialized.
    pub log_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database: DatabaseTarget::Memory,
            worker_threads: DEFAULT_WORKER_THREADS,
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl EngineConfig {
    /// Reads configuration from the process environment.
    ///
    /// Unset or blank variables keep their defaults; `REQGRAPH_DB_PATH=:memory:`
    /// selects the in-memory backend.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`EngineConfig::from_env`] with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        if let Some(path) = read(ENV_DB_PATH) {
            config.database = if path == MEMORY_DB_PATH {
                DatabaseTarget::Memory
            } else {
                DatabaseTarget::File(PathBuf::from(path))
            };
        }

        if let Some(raw) = read(ENV_WORKERS) {
            config.worker_threads = match raw.parse::<usize>() {
                Ok(count) if count >= 1 => count,
                _ => return Err(ConfigError::InvalidWorkerCount(raw)),
            };
        }

        if let Some(raw) = read(ENV_LOG_LEVEL) {
            config.log_level = normalize_level(&raw)
                .map_err(|_| ConfigError::InvalidLogLevel(raw.clone()))?
                .to_string();
        }

        if let Some(raw) = read(ENV_LOG_DIR) {
            let dir = PathBuf::from(&raw);
            if !dir.is_absolute() {
                return Err(ConfigError::InvalidLogDir(raw));
            }
            config.log_dir = Some(dir);
        }

        Ok(config)
    }

    /// Opens the configured backend.
    pub fn open_store(&self) -> StoreResult<Arc<dyn GraphStore>> {
        let store: Arc<dyn GraphStore> = match &self.database {
            DatabaseTarget::File(path) => Arc::new(SqliteGraphStore::open(path)?),
            DatabaseTarget::Memory => Arc::new(MemoryGraphStore::new()),
        };
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, DatabaseTarget, EngineConfig};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn config_from(pairs: &[(&str, &str)]) -> Result<EngineConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        EngineConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.worker_threads, 4);
        assert_eq!(config.database, DatabaseTarget::Memory);
    }

    #[test]
    fn reads_every_variable() {
        let config = config_from(&[
            ("REQGRAPH_DB_PATH", "/var/lib/reqgraph/graph.db"),
            ("REQGRAPH_WORKERS", " 8 "),
            ("REQGRAPH_LOG_LEVEL", "WARNING"),
            ("REQGRAPH_LOG_DIR", "/var/log/reqgraph"),
        ])
        .unwrap();
        assert_eq!(
            config.database,
            DatabaseTarget::File(PathBuf::from("/var/lib/reqgraph/graph.db"))
        );
        assert_eq!(config.worker_threads, 8);
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/reqgraph")));
    }

    #[test]
    fn rejects_invalid_values() {
        assert_eq!(
            config_from(&[("REQGRAPH_WORKERS", "0")]).unwrap_err(),
            ConfigError::InvalidWorkerCount("0".to_string())
        );
        assert!(matches!(
            config_from(&[("REQGRAPH_LOG_LEVEL", "loud")]),
            Err(ConfigError::InvalidLogLevel(_))
        ));
        assert!(matches!(
            config_from(&[("REQGRAPH_LOG_DIR", "logs")]),
            Err(ConfigError::InvalidLogDir(_))
        ));
    }

    #[test]
    fn memory_marker_selects_memory_backend() {
        let config = config_from(&[("REQGRAPH_DB_PATH", ":memory:")]).unwrap();
        assert_eq!(config.database, DatabaseTarget::Memory);
        let store = config.open_store().unwrap();
        assert_eq!(store.record_count().unwrap(), 0);
    }
}
