//! Retry command implementation
//!
//! Moves failed records back to the queue, unchanged.

use crate::domain::{FieldSyncError, RecordId};
use clap::{ArgGroup, Args};
use tokio::sync::watch;

/// Arguments for the retry command
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("target").required(true).args(["id", "all"])))]
pub struct RetryArgs {
    /// Record ID to requeue
    #[arg(long)]
    pub id: Option<String>,

    /// Requeue every failed record
    #[arg(long)]
    pub all: bool,

    /// Run a sync pass afterwards
    #[arg(long)]
    pub sync: bool,
}

impl RetryArgs {
    /// Execute the retry command
    pub async fn execute(
        &self,
        config_path: &str,
        mut shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        let context = match super::open_context(config_path).await {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        let requeued = match &self.id {
            Some(raw) => match RecordId::new(raw.clone()) {
                Ok(id) => context.lifecycle().requeue(&id).await.map(|_| 1),
                Err(e) => Err(FieldSyncError::Other(e)),
            },
            None => context.requeue_failed().await,
        };

        let mut code = match requeued {
            Ok(n) => {
                println!("↪️  Requeued {n} record(s)");
                super::EXIT_OK
            }
            Err(FieldSyncError::InvalidTransition { from, .. }) => {
                println!("❌ Only failed records can be retried (record is {from})");
                super::EXIT_INVALID_INPUT
            }
            Err(FieldSyncError::NotFound(id)) => {
                println!("❌ Record not found: {id}");
                super::EXIT_INVALID_INPUT
            }
            Err(FieldSyncError::Other(e)) => {
                println!("❌ {e}");
                super::EXIT_INVALID_INPUT
            }
            Err(e) => {
                println!("❌ Failed to requeue");
                println!("   Error: {e}");
                super::EXIT_FATAL
            }
        };

        if code == super::EXIT_OK && self.sync {
            println!();
            code = match super::sync::run_interruptible(&context, &mut shutdown_signal).await {
                Ok(outcome) => {
                    super::print_sync_outcome(&outcome);
                    super::sync_exit_code(&outcome)
                }
                Err(e) => {
                    println!("❌ Sync failed");
                    println!("   Error: {e}");
                    super::EXIT_FATAL
                }
            };
        }

        context.shutdown().await;
        Ok(code)
    }
}
