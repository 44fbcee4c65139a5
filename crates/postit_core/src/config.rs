//! Runtime configuration for the core.
//!
//! # Responsibility
//! - Resolve defaults, an optional JSON document and environment overrides.
//! - Reject configurations the store or logger would refuse later.
//!
//! # Invariants
//! - `collection` is always a legal child key once validated.
//! - Setting `POSTIT_DB_PATH` always selects the sqlite backend.

use crate::logging::{default_log_level, normalize_level};
use crate::store::{validate_key, KeyError};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const DEFAULT_COLLECTION: &str = "Post-it";

pub const ENV_COLLECTION: &str = "POSTIT_COLLECTION";
pub const ENV_DB_PATH: &str = "POSTIT_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "POSTIT_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "POSTIT_LOG_DIR";

/// Backend holding the collection locally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreConfig {
    /// Process-local, lost on exit.
    #[default]
    Memory,
    /// SQLite file at `path`.
    Sqlite { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    pub collection: String,
    pub store: StoreConfig,
    /// `None` falls back to the build-mode default.
    pub log_level: Option<String>,
    /// File logging stays off while unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            store: StoreConfig::Memory,
            log_level: None,
            log_dir: None,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
    InvalidCollection(KeyError),
    InvalidLogLevel(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid config document: {err}"),
            Self::InvalidCollection(err) => write!(f, "invalid collection name: {err}"),
            Self::InvalidLogLevel(level) => write!(f, "unsupported log level `{level}`"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::InvalidCollection(err) => Some(err),
            Self::InvalidLogLevel(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

impl From<KeyError> for ConfigError {
    fn from(value: KeyError) -> Self {
        Self::InvalidCollection(value)
    }
}

impl CoreConfig {
    /// Parses a JSON document; missing fields take their defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus process environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides(|name| std::env::var(name).ok())
    }

    /// Applies `POSTIT_*` overrides read through `lookup`, then validates.
    ///
    /// Blank values are ignored.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(collection) = lookup(ENV_COLLECTION) {
            self.collection = collection;
        }
        if let Some(path) = lookup(ENV_DB_PATH) {
            self.store = StoreConfig::Sqlite {
                path: PathBuf::from(path),
            };
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = Some(level);
        }
        if let Some(dir) = lookup(ENV_LOG_DIR) {
            self.log_dir = Some(PathBuf::from(dir));
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_key(&self.collection)?;
        if let Some(level) = &self.log_level {
            normalize_level(level).map_err(|_| ConfigError::InvalidLogLevel(level.clone()))?;
        }
        Ok(())
    }

    /// Configured level, or the build-mode default.
    pub fn effective_log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(default_log_level())
    }
}
