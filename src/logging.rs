//! # Structured Logging Module
//!
//! Environment-aware structured logging that outputs to both console and a
//! JSON log file, so a job can be followed across worker, reducer and intake
//! processes by its `job_id`.

use chrono::Utc;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use uuid::Uuid;

static LOGGER_INITIALIZED: OnceLock<Option<WorkerGuard>> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration.
///
/// Safe to call more than once; only the first call installs a subscriber.
/// `RUST_LOG`, when set, overrides the environment's default level.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| get_log_level(&environment));

        let console_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_level(true)
            .with_ansi(true)
            .with_filter(EnvFilter::new(&log_level));

        let pid = process::id();
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let log_filename = format!("{environment}.{pid}.{timestamp}.log");
        let log_dir = PathBuf::from("log");

        // File output is best effort; console logging works without it
        let (file_layer, guard) = match fs::create_dir_all(&log_dir) {
            Ok(()) => {
                let appender = tracing_appender::rolling::never(&log_dir, &log_filename);
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let layer = fmt::layer()
                    .with_writer(writer)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_level(true)
                    .with_ansi(false)
                    .json()
                    .with_filter(EnvFilter::new(&log_level));
                (Some(layer), Some(guard))
            }
            Err(e) => {
                eprintln!("geotally: file logging disabled, cannot create {}: {e}", log_dir.display());
                (None, None)
            }
        };

        let initialized = tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer)
            .try_init()
            .is_ok();

        if initialized {
            tracing::info!(
                pid = pid,
                environment = %environment,
                log_file = %log_dir.join(&log_filename).display(),
                "🔧 STRUCTURED LOGGING: Initialized"
            );
        } else {
            // Another subscriber (usually a test harness) got there first
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        guard
    });
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var("GEOTALLY_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> String {
    match environment {
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

/// Log structured data for queue operations
pub fn log_queue_operation(operation: &str, queue: &str, job_id: &Uuid, task: &str) {
    tracing::debug!(
        operation = %operation,
        queue = %queue,
        job_id = %job_id,
        task = %task,
        "📬 QUEUE_OPERATION"
    );
}

/// Log structured data for job lifecycle events
pub fn log_job_operation(
    operation: &str,
    job_id: &Uuid,
    received: usize,
    expected: usize,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        job_id = %job_id,
        received = received,
        expected = expected,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "🗺️ JOB_OPERATION"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(get_log_level("test"), "debug");
        assert_eq!(get_log_level("development"), "debug");
        assert_eq!(get_log_level("production"), "info");
        assert_eq!(get_log_level("unknown"), "debug");
    }

    #[test]
    fn test_init_is_idempotent() {
        init_structured_logging();
        init_structured_logging();
        log_job_operation("created", &Uuid::new_v4(), 0, 4, None);
    }
}
