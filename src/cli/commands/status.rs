//! Status command implementation
//!
//! Shows local queue counts, records needing attention, the signed-in user
//! and remote reachability.

use crate::adapters::store::{RecordFilter, RecordStore};
use crate::core::auth::Session;
use crate::core::network::Connectivity;
use crate::domain::{RecordMetadata, RecordStatus, Result};
use clap::Args;
use serde::Serialize;
use std::collections::BTreeMap;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Maximum records listed per status
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

/// A record that has not reached the server yet
#[derive(Debug, Serialize)]
struct QueuedRecord {
    health_id: String,
    status: RecordStatus,
    retry_count: u32,
    last_error: Option<String>,
}

impl From<&RecordMetadata> for QueuedRecord {
    fn from(meta: &RecordMetadata) -> Self {
        Self {
            health_id: meta.health_id.to_string(),
            status: meta.status,
            retry_count: meta.retry_count,
            last_error: meta.last_error.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct StatusReport {
    counts: BTreeMap<String, usize>,
    pending: Vec<QueuedRecord>,
    failed: Vec<QueuedRecord>,
    signed_in_as: Option<String>,
    session_expires_at: Option<chrono::DateTime<chrono::Utc>>,
    held_form: bool,
    connectivity: Connectivity,
}

async fn build_report(
    store: &dyn RecordStore,
    session: Option<Session>,
    held_form: bool,
    connectivity: Connectivity,
    limit: usize,
) -> Result<StatusReport> {
    let mut counts = BTreeMap::new();
    for status in RecordStatus::all() {
        let n = store.count(&RecordFilter::status(status)).await?;
        counts.insert(status.to_string(), n);
    }

    let pending = store
        .list_metadata(&RecordFilter::status(RecordStatus::Pending).with_limit(limit))
        .await?;
    let failed = store
        .list_metadata(&RecordFilter::status(RecordStatus::Failed).with_limit(limit))
        .await?;

    Ok(StatusReport {
        counts,
        pending: pending.iter().map(QueuedRecord::from).collect(),
        failed: failed.iter().map(QueuedRecord::from).collect(),
        signed_in_as: session.as_ref().map(|s| s.login.to_string()),
        session_expires_at: session.and_then(|s| s.expires_at),
        held_form,
        connectivity,
    })
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking sync status");

        let context = match super::open_context(config_path).await {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        let session = context.sessions().current().await;
        let held = context.gate().held().await;
        let report = match (session, held) {
            (Ok(session), Ok(held)) => {
                build_report(
                    context.store().as_ref(),
                    session,
                    held.is_some(),
                    context.monitor().current(),
                    self.limit,
                )
                .await
            }
            (Err(e), _) | (_, Err(e)) => Err(e),
        };

        let code = match report {
            Ok(report) if self.json => {
                println!("{}", serde_json::to_string_pretty(&report)?);
                super::EXIT_OK
            }
            Ok(report) => {
                print_report(&report);
                super::EXIT_OK
            }
            Err(e) => {
                println!("❌ Failed to read the local store");
                println!("   Error: {e}");
                super::EXIT_FATAL
            }
        };

        context.shutdown().await;
        Ok(code)
    }
}

fn print_report(report: &StatusReport) {
    println!("📊 Sync Status");
    println!();

    println!("Records:");
    for (status, n) in &report.counts {
        println!("  {status}: {n}");
    }
    println!();

    match &report.signed_in_as {
        Some(user) => {
            print!("🔑 Signed in as {user}");
            match report.session_expires_at {
                Some(at) => println!(" (expires {})", at.format("%Y-%m-%d %H:%M UTC")),
                None => println!(),
            }
        }
        None => println!("🔒 Not signed in"),
    }
    if report.held_form {
        println!("⚠️  A submission is waiting for sign-in");
    }

    let c = &report.connectivity;
    if c.online {
        match c.latency_ms {
            Some(ms) => println!("🌐 Remote reachable ({}, {ms}ms)", c.quality),
            None => println!("🌐 Remote reachable ({})", c.quality),
        }
    } else {
        println!("📴 Remote unreachable");
    }

    print_queue("⏳ Pending", &report.pending);
    print_queue("❌ Failed", &report.failed);
}

fn print_queue(title: &str, records: &[QueuedRecord]) {
    if records.is_empty() {
        return;
    }
    println!();
    println!("{title}:");
    for record in records {
        match &record.last_error {
            Some(reason) => println!(
                "  - {} retries={}: {}",
                record.health_id, record.retry_count, reason
            ),
            None => println!("  - {} retries={}", record.health_id, record.retry_count),
        }
    }
}
