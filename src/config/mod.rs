//! # Geotally Configuration
//!
//! Typed configuration for every process that touches the queues: the
//! queue names, how long polled items stay invisible, how poll loops back
//! off, and how result handles wait.
//!
//! `GeotallyConfig::default()` is a complete working configuration. Files
//! and environment variables only override it; see [`ConfigManager`] for
//! the layering order.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use geotally::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let config = manager.config();
//!
//! let backoff = config.polling.loop_backoff();
//! let visibility = config.messaging.visibility_timeout();
//! # Ok(())
//! # }
//! ```

pub mod loader;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use crate::constants::queues;
use crate::error::{GeotallyError, Result};
use crate::processing::{BackoffPolicy, LoopBackoff};

pub use loader::ConfigManager;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeotallyConfig {
    pub messaging: MessagingConfig,
    pub polling: PollingConfig,
    pub results: ResultsConfig,
    pub database: DatabaseConfig,
    pub worker: WorkerConfig,
}

impl GeotallyConfig {
    /// Reject configurations no process could run with
    pub fn validate(&self) -> Result<()> {
        self.messaging.validate()?;
        self.polling.validate()?;
        if self.results.poll_interval_ms == 0 {
            return Err(invalid("results.poll_interval_ms", "must be positive"));
        }
        if self.database.max_connections == 0 {
            return Err(invalid("database.max_connections", "must be positive"));
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> GeotallyError {
    GeotallyError::Configuration(format!("{field} {reason}"))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagingConfig {
    pub task_queue: String,
    pub result_queue: String,
    pub request_queue: String,
    /// How long a polled item stays hidden from other consumers
    pub visibility_timeout_seconds: u64,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            task_queue: queues::TASK_QUEUE.to_string(),
            result_queue: queues::RESULT_QUEUE.to_string(),
            request_queue: queues::REQUEST_QUEUE.to_string(),
            visibility_timeout_seconds: 30,
        }
    }
}

impl MessagingConfig {
    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout_seconds)
    }

    pub fn queue_names(&self) -> [&str; 3] {
        [&self.task_queue, &self.result_queue, &self.request_queue]
    }

    fn validate(&self) -> Result<()> {
        let names = self.queue_names();
        if names.iter().any(|name| name.trim().is_empty()) {
            return Err(invalid("messaging queue names", "must not be empty"));
        }
        if names.iter().collect::<HashSet<_>>().len() != names.len() {
            return Err(invalid("messaging queue names", "must be distinct"));
        }
        if self.visibility_timeout_seconds == 0 {
            return Err(invalid("messaging.visibility_timeout_seconds", "must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub idle_initial_ms: u64,
    pub idle_max_ms: u64,
    pub failure_initial_ms: u64,
    pub failure_max_ms: u64,
    pub multiplier: f64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            idle_initial_ms: 10,
            idle_max_ms: 1_000,
            failure_initial_ms: 100,
            failure_max_ms: 30_000,
            multiplier: 2.0,
        }
    }
}

impl PollingConfig {
    pub fn loop_backoff(&self) -> LoopBackoff {
        LoopBackoff {
            idle: BackoffPolicy::new(
                Duration::from_millis(self.idle_initial_ms),
                Duration::from_millis(self.idle_max_ms),
                self.multiplier,
            ),
            failure: BackoffPolicy::new(
                Duration::from_millis(self.failure_initial_ms),
                Duration::from_millis(self.failure_max_ms),
                self.multiplier,
            ),
        }
    }

    fn validate(&self) -> Result<()> {
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(invalid("polling.multiplier", "must be at least 1"));
        }
        if self.idle_initial_ms == 0 || self.failure_initial_ms == 0 {
            return Err(invalid("polling initial delays", "must be positive"));
        }
        if self.idle_max_ms < self.idle_initial_ms {
            return Err(invalid("polling.idle_max_ms", "must not be below idle_initial_ms"));
        }
        if self.failure_max_ms < self.failure_initial_ms {
            return Err(invalid(
                "polling.failure_max_ms",
                "must not be below failure_initial_ms",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultsConfig {
    /// Interval between job reads while blocking on a result
    pub poll_interval_ms: u64,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1_000,
        }
    }
}

impl ResultsConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Postgres URL for the pgmq transport, job store and tweet source.
    /// Falls back to `DATABASE_URL` when unset.
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
        }
    }
}

impl DatabaseConfig {
    pub fn resolved_url(&self) -> Option<String> {
        self.url
            .clone()
            .or_else(|| std::env::var("DATABASE_URL").ok())
    }
}

/// Local loop counts for `geotally-node`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub workers: usize,
    pub reducers: usize,
    pub request_processors: usize,
    /// Only count tweets at most this old
    pub tweet_max_age_seconds: Option<u64>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            reducers: 1,
            request_processors: 1,
            tweet_max_age_seconds: None,
        }
    }
}
