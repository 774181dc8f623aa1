//! Sync command implementation

use crate::core::context::EngineContext;
use crate::core::sync::SyncOutcome;
use crate::domain::Result;
use clap::Args;
use tokio::sync::watch;

/// Arguments for the sync command
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Requeue failed records before syncing
    #[arg(long)]
    pub include_failed: bool,
}

/// Runs one pass, stopping it early if a shutdown signal arrives
pub(crate) async fn run_interruptible(
    context: &EngineContext,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<SyncOutcome> {
    let pass = context.sync_now();
    tokio::pin!(pass);

    tokio::select! {
        outcome = &mut pass => outcome,
        _ = super::stop_requested(shutdown) => {
            tracing::warn!("Shutdown requested during sync; stopping after the current record");
            context.request_shutdown();
            pass.await
        }
    }
}

impl SyncArgs {
    /// Execute the sync command
    pub async fn execute(
        &self,
        config_path: &str,
        mut shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!(include_failed = self.include_failed, "Starting manual sync");

        println!("🔄 Syncing pending records");
        println!();

        let context = match super::open_context(config_path).await {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        if self.include_failed {
            match context.requeue_failed().await {
                Ok(n) if n > 0 => println!("↪️  Requeued {n} failed record(s)"),
                Ok(_) => {}
                Err(e) => {
                    println!("❌ Failed to requeue records");
                    println!("   Error: {e}");
                    context.shutdown().await;
                    return Ok(super::EXIT_FATAL);
                }
            }
        }

        let code = match run_interruptible(&context, &mut shutdown_signal).await {
            Ok(outcome) => {
                super::print_sync_outcome(&outcome);
                super::sync_exit_code(&outcome)
            }
            Err(e) => {
                tracing::error!(error = %e, "Sync failed");
                println!("❌ Sync failed");
                println!("   Error: {e}");
                super::EXIT_FATAL
            }
        };

        context.shutdown().await;
        Ok(code)
    }
}
