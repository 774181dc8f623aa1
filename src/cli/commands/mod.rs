//! CLI command implementations
//!
//! Every command returns a process exit code:
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | Success |
//! | 1 | Invalid input (form, login, arguments) |
//! | 2 | Configuration error |
//! | 3 | Sync finished with records not synced |
//! | 4 | Remote collaborator unreachable |
//! | 5 | Fatal error |

pub mod init;
pub mod login;
pub mod purge;
pub mod retry;
pub mod status;
pub mod submit;
pub mod sync;
pub mod validate;
pub mod worker;

use crate::config::{load_config, FieldSyncConfig};
use crate::core::context::EngineContext;
use crate::core::sync::{SyncOutcome, SyncSummary};
use tokio::sync::watch;

pub const EXIT_OK: i32 = 0;
pub const EXIT_INVALID_INPUT: i32 = 1;
pub const EXIT_CONFIG: i32 = 2;
pub const EXIT_PARTIAL: i32 = 3;
pub const EXIT_CONNECTION: i32 = 4;
pub const EXIT_FATAL: i32 = 5;

/// Loads and validates configuration, printing the problem on failure
pub(crate) fn load_validated(config_path: &str) -> Result<FieldSyncConfig, i32> {
    match load_config(config_path) {
        Ok(config) => Ok(config),
        Err(e) => {
            println!("❌ Failed to load configuration file");
            println!("   Error: {e}");
            Err(EXIT_CONFIG)
        }
    }
}

/// Builds the engine context, mapping failures to an exit code
pub(crate) async fn open_context(config_path: &str) -> Result<EngineContext, i32> {
    let config = load_validated(config_path)?;
    match EngineContext::init(config).await {
        Ok(context) => Ok(context),
        Err(e) => {
            println!("❌ Failed to open the local store");
            println!("   Error: {e}");
            Err(EXIT_FATAL)
        }
    }
}

/// Resolves once `shutdown` reads true; never resolves if the sender is gone
pub(crate) async fn stop_requested(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Exit code for a finished sync call
pub(crate) fn sync_exit_code(outcome: &SyncOutcome) -> i32 {
    match outcome {
        SyncOutcome::Offline => EXIT_CONNECTION,
        SyncOutcome::AlreadyRunning => EXIT_OK,
        SyncOutcome::Completed(summary) if summary.is_successful() => EXIT_OK,
        SyncOutcome::Completed(_) => EXIT_PARTIAL,
    }
}

pub(crate) fn print_sync_outcome(outcome: &SyncOutcome) {
    match outcome {
        SyncOutcome::AlreadyRunning => println!("⏳ A sync pass is already running"),
        SyncOutcome::Offline => println!("📴 Remote collaborator unreachable; records stay queued"),
        SyncOutcome::Completed(summary) => print_summary(summary),
    }
}

fn print_summary(summary: &SyncSummary) {
    println!("📊 Sync Summary:");
    println!("  Pending at start: {}", summary.total);
    println!("  Path: {}", summary.path);
    println!("  Synced: {}", summary.synced);
    if summary.already_synced > 0 {
        println!("  Already synced elsewhere: {}", summary.already_synced);
    }
    println!("  Failed: {}", summary.failed);
    println!("  Queued for retry: {}", summary.retry_scheduled);
    if summary.aborted {
        println!("  ⚠️  Stopped early; {} record(s) not attempted", summary.untouched());
    }
    println!("  Duration: {:.2}s", summary.duration.as_secs_f64());

    if !summary.failures.is_empty() {
        println!();
        println!("⚠️  Records not synced:");
        for failure in &summary.failures {
            let state = if failure.parked { "failed" } else { "pending" };
            println!(
                "  - {} [{}] retries={}: {}",
                failure.health_id, state, failure.retry_count, failure.reason
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_exit_codes() {
        assert_eq!(sync_exit_code(&SyncOutcome::Offline), EXIT_CONNECTION);
        assert_eq!(sync_exit_code(&SyncOutcome::AlreadyRunning), EXIT_OK);
        assert_eq!(
            sync_exit_code(&SyncOutcome::Completed(SyncSummary::new(0))),
            EXIT_OK
        );

        let mut partial = SyncSummary::new(2);
        partial.synced = 1;
        assert_eq!(
            sync_exit_code(&SyncOutcome::Completed(partial)),
            EXIT_PARTIAL
        );
    }

    #[test]
    fn test_missing_config_is_config_error() {
        assert_eq!(
            load_validated("/nonexistent/fieldsync.toml").unwrap_err(),
            EXIT_CONFIG
        );
    }
}
