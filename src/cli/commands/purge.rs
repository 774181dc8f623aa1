//! Purge command implementation

use crate::domain::RecordId;
use clap::{ArgGroup, Args};

/// Arguments for the purge command
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("target").required(true).args(["id", "synced"])))]
pub struct PurgeArgs {
    /// Record ID to delete, whatever its status
    #[arg(long)]
    pub id: Option<String>,

    /// Delete every record already synced
    #[arg(long)]
    pub synced: bool,
}

impl PurgeArgs {
    /// Execute the purge command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let id = match self.id.as_deref().map(RecordId::new).transpose() {
            Ok(id) => id,
            Err(e) => {
                println!("❌ {e}");
                return Ok(super::EXIT_INVALID_INPUT);
            }
        };

        let context = match super::open_context(config_path).await {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        let result = match &id {
            Some(id) => context.lifecycle().purge(id).await.map(usize::from),
            None => context.lifecycle().purge_synced().await,
        };

        let code = match result {
            Ok(0) if id.is_some() => {
                println!("⚠️  No record with that ID");
                super::EXIT_INVALID_INPUT
            }
            Ok(n) => {
                println!("🗑️  Deleted {n} record(s)");
                super::EXIT_OK
            }
            Err(e) => {
                println!("❌ Failed to delete records");
                println!("   Error: {e}");
                super::EXIT_FATAL
            }
        };

        context.shutdown().await;
        Ok(code)
    }
}
