//! Worker command implementation
//!
//! Runs the background sync worker in the foreground of a terminal: the
//! reachability probe feeds connectivity changes to the worker, which syncs
//! with its own store connection and reports back over its message channel.

use crate::core::background::{BackgroundWorker, WorkerEvent, WorkerMessage};
use clap::Args;
use tokio::sync::{broadcast, watch};

/// Arguments for the worker command
#[derive(Args, Debug)]
pub struct WorkerArgs {
    /// Sync tag to register; defaults to background.sync_tag
    #[arg(long)]
    pub tag: Option<String>,

    /// Skip the initial sync pass at startup
    #[arg(long)]
    pub no_initial_sync: bool,
}

fn print_message(message: &WorkerMessage) {
    match message {
        WorkerMessage::SyncCompleted { tag, synced } => {
            println!("✅ [{tag}] sync finished, {synced} record(s) synced")
        }
        WorkerMessage::SyncFailed { tag, reason } => println!("❌ [{tag}] sync failed: {reason}"),
        WorkerMessage::Offline { tag } => {
            println!("📴 [{tag}] remote unreachable, records stay queued")
        }
    }
}

impl WorkerArgs {
    /// Execute the worker command
    pub async fn execute(
        &self,
        config_path: &str,
        mut shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        let context = match super::open_context(config_path).await {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };
        let tag = self
            .tag
            .clone()
            .unwrap_or_else(|| context.config().background.sync_tag.clone());

        let worker = match BackgroundWorker::spawn(context.config(), tag.clone()).await {
            Ok(w) => w,
            Err(e) => {
                println!("❌ Failed to start the background worker");
                println!("   Error: {e}");
                context.shutdown().await;
                return Ok(super::EXIT_FATAL);
            }
        };
        let handle = worker.handle();
        let mut messages = worker.subscribe();

        let probe = tokio::spawn(context.monitor().clone().run(shutdown_signal.clone()));
        let mut connectivity = context.monitor().subscribe();
        let mut was_online = connectivity.borrow_and_update().online;

        println!("👷 Background worker running for tag '{tag}' (Ctrl+C to stop)");
        if !self.no_initial_sync {
            handle.send(WorkerEvent::Sync { tag: tag.clone() }).await;
        }

        loop {
            tokio::select! {
                changed = connectivity.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let online = connectivity.borrow_and_update().online;
                    if online && !was_online {
                        println!("🌐 Connectivity restored");
                        if !handle.send(WorkerEvent::ConnectivityRestored).await {
                            break;
                        }
                    } else if !online && was_online {
                        println!("📴 Connectivity lost");
                    }
                    was_online = online;
                }
                message = messages.recv() => match message {
                    Ok(message) => print_message(&message),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "Worker messages dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = super::stop_requested(&mut shutdown_signal) => break,
            }
        }

        println!("⚠️  Stopping background worker...");
        worker.shutdown().await;
        context.request_shutdown();
        if let Err(e) = probe.await {
            tracing::error!(error = %e, "Reachability probe task failed");
        }
        context.shutdown().await;
        Ok(super::EXIT_OK)
    }
}
