//! # Configuration
//!
//! Layered configuration: built-in defaults, then an optional TOML file, then
//! `TASKHIVE_*` environment variables (`__` separates nested keys, e.g.
//! `TASKHIVE_WAIT__POLL_INTERVAL_MS=50`).

use crate::constants::channels;
use crate::error::{Result, TaskhiveError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TaskhiveConfig {
    pub queue: QueueConfig,
    pub result_store: ResultStoreConfig,
    pub wait: WaitConfig,
    pub worker: WorkerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QueueConfig {
    pub new_task_channel: String,
    pub dead_letter_channel: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            new_task_channel: channels::NEW_TASK.to_string(),
            dead_letter_channel: channels::DEAD_LETTER.to_string(),
        }
    }
}

/// Where a worker persists computed results; rendered into every result locator
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResultStoreConfig {
    pub kind: String,
    pub host: String,
    pub port: Option<u16>,
    pub namespace: String,
}

impl Default for ResultStoreConfig {
    fn default() -> Self {
        Self {
            kind: "memory".to_string(),
            host: "127.0.0.1".to_string(),
            port: Some(6379),
            namespace: "0".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WaitConfig {
    /// One polling "time unit" of the fallback wait path
    pub poll_interval_ms: u64,
    /// Growth factor applied to the interval after each poll; 1.0 keeps it fixed
    pub backoff_multiplier: f64,
    pub max_poll_interval_ms: u64,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            backoff_multiplier: 1.0,
            max_poll_interval_ms: 30_000,
        }
    }
}

impl WaitConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_poll_interval(&self) -> Duration {
        Duration::from_millis(self.max_poll_interval_ms.max(self.poll_interval_ms))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub invocation_timeout_ms: u64,
    /// `None` blocks indefinitely on the intake channel
    pub reserve_timeout_ms: Option<u64>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            invocation_timeout_ms: 300_000,
            reserve_timeout_ms: None,
        }
    }
}

impl WorkerConfig {
    pub fn invocation_timeout(&self) -> Duration {
        Duration::from_millis(self.invocation_timeout_ms)
    }

    pub fn reserve_timeout(&self) -> Option<Duration> {
        self.reserve_timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub json: bool,
}

impl TaskhiveConfig {
    /// Load defaults, overlay `path` (if given) and `TASKHIVE_*` environment variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Self::default())?);

        if let Some(path) = path {
            debug!(path = %path.display(), "📄 Loading configuration file");
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }

        let config: Self = builder
            .add_source(
                config::Environment::with_prefix("TASKHIVE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Environment-only variant of [`TaskhiveConfig::load`]
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    pub fn validate(&self) -> Result<()> {
        if self.queue.new_task_channel.is_empty() {
            return Err(TaskhiveError::Configuration(
                "queue.new_task_channel must not be empty".to_string(),
            ));
        }
        if self.queue.dead_letter_channel.is_empty() {
            return Err(TaskhiveError::Configuration(
                "queue.dead_letter_channel must not be empty".to_string(),
            ));
        }
        if self.wait.poll_interval_ms == 0 {
            return Err(TaskhiveError::Configuration(
                "wait.poll_interval_ms must be positive".to_string(),
            ));
        }
        if self.wait.backoff_multiplier.is_nan() || self.wait.backoff_multiplier < 1.0 {
            return Err(TaskhiveError::Configuration(
                "wait.backoff_multiplier must be at least 1.0".to_string(),
            ));
        }
        if self.worker.invocation_timeout_ms == 0 {
            return Err(TaskhiveError::Configuration(
                "worker.invocation_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
