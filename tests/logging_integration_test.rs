//! Integration tests for logging functionality
//!
//! The global subscriber can only be installed once per process, so a single
//! test exercises `init_logging` end to end.

use fieldsync::config::LoggingConfig;
use fieldsync::logging::init_logging;
use fieldsync::{log_record_failure, log_retry_attempt, log_sync_complete, log_sync_start};
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_logging_config_default() {
    let config = LoggingConfig::default();
    assert!(config.local_enabled);
    assert_eq!(config.local_path, "./logs");
    assert_eq!(config.local_rotation, "daily");
}

#[test]
fn test_file_logging_writes_json_lines() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("logs");

    let config = LoggingConfig {
        local_enabled: true,
        local_path: log_path.to_string_lossy().to_string(),
        local_rotation: "never".to_string(),
    };

    // Events from this test crate sit outside the default `fieldsync=` filter
    std::env::set_var("RUST_LOG", "debug");
    let guard = init_logging("debug", &config).unwrap();
    assert!(log_path.exists());

    log_sync_start!(3, "batch");
    log_record_failure!("rec-1", 1, "Request timeout: slow link", true);
    log_retry_attempt!(1, 3, "Request timeout: slow link");
    log_sync_complete!(2, 1, Duration::from_millis(420));

    // A second subscriber cannot be installed
    assert!(init_logging("info", &config).is_err());

    // Dropping the guard flushes the non-blocking writer
    drop(guard);

    let content = std::fs::read_to_string(log_path.join("fieldsync.log")).unwrap();
    let lines: Vec<serde_json::Value> = content
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();

    assert!(lines
        .iter()
        .any(|l| l["fields"]["message"] == "Record upload failed" && l["fields"]["record_id"] == "rec-1"));
    assert!(lines
        .iter()
        .any(|l| l["fields"]["message"] == "Sync pass completed" && l["fields"]["duration_ms"] == 420));
    assert!(lines
        .iter()
        .any(|l| l["fields"]["message"] == "Logging initialized"));
}

#[test]
fn test_invalid_level_is_rejected_before_install() {
    let config = LoggingConfig {
        local_enabled: false,
        local_path: String::new(),
        local_rotation: "daily".to_string(),
    };
    assert!(init_logging("loud", &config).is_err());
}
