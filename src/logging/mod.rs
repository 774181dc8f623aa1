//! Logging and observability
//!
//! Structured `tracing` output with a console layer and an optional rolling
//! JSON file layer. Sensitive record fields are never passed to the log
//! macros; records are identified by `record_id` and `health_id` only.
//!
//! # Example
//!
//! ```no_run
//! use fieldsync::config::LoggingConfig;
//! use fieldsync::logging::init_logging;
//!
//! let _guard = init_logging("info", &LoggingConfig::default()).expect("logging");
//! tracing::info!(pending = 3, "Queue loaded");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log the start of a sync pass
///
/// ```no_run
/// use fieldsync::log_sync_start;
///
/// log_sync_start!(12, "batch");
/// ```
#[macro_export]
macro_rules! log_sync_start {
    ($pending:expr, $path:expr) => {
        tracing::info!(pending = $pending, path = %$path, "Starting sync pass");
    };
}

/// Log the end of a sync pass
///
/// ```no_run
/// use fieldsync::log_sync_complete;
/// use std::time::Duration;
///
/// log_sync_complete!(10, 2, Duration::from_millis(850));
/// ```
#[macro_export]
macro_rules! log_sync_complete {
    ($synced:expr, $failed:expr, $duration:expr) => {
        tracing::info!(
            synced = $synced,
            failed = $failed,
            duration_ms = $duration.as_millis() as u64,
            "Sync pass completed"
        );
    };
}

/// Log a record that failed to upload
///
/// ```no_run
/// use fieldsync::log_record_failure;
///
/// log_record_failure!("4f1c", 2, "timeout", true);
/// ```
#[macro_export]
macro_rules! log_record_failure {
    ($record_id:expr, $retry_count:expr, $reason:expr, $retryable:expr) => {
        tracing::warn!(
            record_id = %$record_id,
            retry_count = $retry_count,
            reason = %$reason,
            retryable = $retryable,
            "Record upload failed"
        );
    };
}

/// Log a retry attempt
///
/// ```no_run
/// use fieldsync::log_retry_attempt;
///
/// log_retry_attempt!(2, 3, "Connection timeout");
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($attempt:expr, $max_attempts:expr, $reason:expr) => {
        tracing::warn!(
            attempt = $attempt,
            max_attempts = $max_attempts,
            reason = %$reason,
            "Retrying operation"
        );
    };
}
