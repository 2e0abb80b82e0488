//! Store configuration.
//!
//! Resolved once at process startup and handed to [`crate::Database::open`].
//! Nothing in the request path reads the environment.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const DB_PATH_VAR: &str = "PATIENT_DB_PATH";
pub const POOL_SIZE_VAR: &str = "PATIENT_DB_POOL_SIZE";
pub const ACQUIRE_TIMEOUT_VAR: &str = "PATIENT_DB_ACQUIRE_TIMEOUT_MS";
pub const ACQUIRE_RETRIES_VAR: &str = "PATIENT_DB_ACQUIRE_RETRIES";
pub const BUSY_TIMEOUT_VAR: &str = "PATIENT_DB_BUSY_TIMEOUT_MS";

const DEFAULT_POOL_SIZE: u32 = 8;
const DEFAULT_ACQUIRE_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_ACQUIRE_RETRIES: u32 = 2;
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Startup configuration errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),

    #[error("environment variable {var} has invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Connection settings for the patient store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    database_path: PathBuf,
    pool_size: u32,
    acquire_timeout: Duration,
    acquire_retries: u32,
    busy_timeout: Duration,
}

impl StoreConfig {
    /// Config for a database file with default pool settings.
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            pool_size: DEFAULT_POOL_SIZE,
            acquire_timeout: Duration::from_millis(DEFAULT_ACQUIRE_TIMEOUT_MS),
            acquire_retries: DEFAULT_ACQUIRE_RETRIES,
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
        }
    }

    /// Read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_path = lookup(DB_PATH_VAR)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing(DB_PATH_VAR))?;

        let pool_size = parse_var(&lookup, POOL_SIZE_VAR, DEFAULT_POOL_SIZE)?;
        if pool_size == 0 {
            return Err(ConfigError::Invalid {
                var: POOL_SIZE_VAR,
                value: pool_size.to_string(),
                reason: "must be at least 1",
            });
        }

        let acquire_timeout_ms =
            parse_var(&lookup, ACQUIRE_TIMEOUT_VAR, DEFAULT_ACQUIRE_TIMEOUT_MS)?;
        if acquire_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                var: ACQUIRE_TIMEOUT_VAR,
                value: acquire_timeout_ms.to_string(),
                reason: "must be greater than zero",
            });
        }

        Ok(Self {
            database_path: PathBuf::from(database_path),
            pool_size,
            acquire_timeout: Duration::from_millis(acquire_timeout_ms),
            acquire_retries: parse_var(&lookup, ACQUIRE_RETRIES_VAR, DEFAULT_ACQUIRE_RETRIES)?,
            busy_timeout: Duration::from_millis(parse_var(
                &lookup,
                BUSY_TIMEOUT_VAR,
                DEFAULT_BUSY_TIMEOUT_MS,
            )?),
        })
    }

    pub fn with_pool_size(mut self, pool_size: u32) -> Self {
        self.pool_size = pool_size.max(1);
        self
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn with_acquire_retries(mut self, retries: u32) -> Self {
        self.acquire_retries = retries;
        self
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn pool_size(&self) -> u32 {
        self.pool_size
    }

    pub fn acquire_timeout(&self) -> Duration {
        self.acquire_timeout
    }

    pub fn acquire_retries(&self) -> u32 {
        self.acquire_retries
    }

    pub fn busy_timeout(&self) -> Duration {
        self.busy_timeout
    }
}

/// Parse an optional variable, falling back to `default` when unset.
pub fn parse_var<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            var,
            value,
            reason: "not a non-negative integer",
        }),
    }
}
