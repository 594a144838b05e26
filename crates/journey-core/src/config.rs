//! Pipeline configuration.
//!
//! Environment variables:
//! - `JOURNEY_DATABASE_URL` (default `sqlite::memory:`)
//! - `JOURNEY_QUEUE_CAPACITY` (default 1048576, at most [`MAX_QUEUE_CAPACITY`])
//! - `JOURNEY_SHUTDOWN_TIMEOUT_SECS` (default 60)

use std::env;
use std::num::NonZeroUsize;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_DATABASE_URL: &str = "sqlite::memory:";
pub const DEFAULT_QUEUE_CAPACITY: NonZeroUsize = NonZeroUsize::new(1024 * 1024).unwrap();
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(60);
/// tokio の bounded mpsc が扱える上限
pub const MAX_QUEUE_CAPACITY: usize = tokio::sync::Semaphore::MAX_PERMITS;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be a positive integer, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },
    #[error("{key} must be at most {max}, got {value}")]
    TooLarge {
        key: &'static str,
        value: usize,
        max: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub database_url: String,
    /// Events buffered between cache and worker before producers wait.
    pub queue_capacity: NonZeroUsize,
    /// Upper bound on waiting for the worker during teardown.
    pub shutdown_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(url) = lookup("JOURNEY_DATABASE_URL") {
            config.database_url = url;
        }
        if let Some(raw) = lookup("JOURNEY_QUEUE_CAPACITY") {
            config.queue_capacity = queue_capacity_for("JOURNEY_QUEUE_CAPACITY", &raw)?;
        }
        if let Some(raw) = lookup("JOURNEY_SHUTDOWN_TIMEOUT_SECS") {
            let secs = parse_positive("JOURNEY_SHUTDOWN_TIMEOUT_SECS", &raw)?;
            config.shutdown_timeout = Duration::from_secs(secs.get() as u64);
        }
        Ok(config)
    }
}

/// Parse a queue capacity. Also used as the CLI's `--queue-capacity` value parser.
pub fn parse_queue_capacity(raw: &str) -> Result<NonZeroUsize, ConfigError> {
    queue_capacity_for("queue capacity", raw)
}

fn queue_capacity_for(key: &'static str, raw: &str) -> Result<NonZeroUsize, ConfigError> {
    let capacity = parse_positive(key, raw)?;
    if capacity.get() > MAX_QUEUE_CAPACITY {
        return Err(ConfigError::TooLarge {
            key,
            value: capacity.get(),
            max: MAX_QUEUE_CAPACITY,
        });
    }
    Ok(capacity)
}

fn parse_positive(key: &'static str, raw: &str) -> Result<NonZeroUsize, ConfigError> {
    raw.trim()
        .parse::<NonZeroUsize>()
        .map_err(|_| ConfigError::InvalidNumber {
            key,
            value: raw.to_string(),
        })
}
