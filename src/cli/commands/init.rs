//! Init command implementation
//!
//! Writes a starter `fieldsync.toml`.

use crate::adapters::store::FieldCipher;
use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "fieldsync.toml")]
    pub output: String,

    /// Write a freshly generated encryption key into the file instead of
    /// referencing ${FIELDSYNC_STORE_KEY}
    #[arg(long)]
    pub generate_key: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing fieldsync configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(super::EXIT_CONFIG);
        }

        let key_line = if self.generate_key {
            format!("encryption_key = \"{}\"", FieldCipher::generate_key())
        } else {
            "encryption_key = \"${FIELDSYNC_STORE_KEY}\"".to_string()
        };

        match fs::write(&self.output, render_config(&key_line)) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Set remote.base_url in {}", self.output);
                if !self.generate_key {
                    println!("  2. Put FIELDSYNC_STORE_KEY in your .env file");
                    println!("     (32 random bytes, base64; keep it: records cannot be read without it)");
                } else {
                    println!("  2. Back up the generated encryption key; records cannot be read without it");
                }
                println!("  3. Validate configuration: fieldsync validate-config");
                println!("  4. Sign in: fieldsync login --kind employeeId --value <id> --token <token>");
                println!();
                Ok(super::EXIT_OK)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(super::EXIT_FATAL)
            }
        }
    }
}

fn render_config(key_line: &str) -> String {
    format!(
        r#"# fieldsync configuration

environment = "development"  # development | staging | production

[application]
log_level = "info"

[remote]
# Server root; records are posted to /api/children
base_url = "https://records.example.org"
timeout_seconds = 30
connect_timeout_seconds = 10
tls_verify = true

[store]
path = "fieldsync.db"
{key_line}

[sync]
max_record_retries = 5
inter_request_delay_ms = 250
auto_sync = true

[sync.retry]
max_attempts = 3
initial_delay_ms = 500
max_delay_ms = 10000
backoff_multiplier = 2.0

[network]
probe_interval_seconds = 30
probe_timeout_ms = 5000
good_latency_ms = 300
poor_latency_ms = 1500

[identity]
health_id_prefix = "CHR"
check_local_uniqueness = false

[background]
sync_tag = "sync-records"

[logging]
local_enabled = true
local_path = "./logs"
local_rotation = "daily"  # daily | hourly | never
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldSyncConfig;

    #[test]
    fn test_rendered_config_is_valid() {
        let content = render_config("encryption_key = \"a-long-passphrase\"");
        let config: FieldSyncConfig = toml::from_str(&content).unwrap();
        config.validate().unwrap();
        assert_eq!(config.remote.base_url, "https://records.example.org");
        assert_eq!(config.sync.max_record_retries, 5);
    }

    #[tokio::test]
    async fn test_refuses_to_overwrite_without_force() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let args = InitArgs {
            output: file.path().display().to_string(),
            generate_key: true,
            force: false,
        };
        assert_eq!(args.execute().await.unwrap(), crate::cli::commands::EXIT_CONFIG);
    }

    #[tokio::test]
    async fn test_writes_generated_key() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("fieldsync.toml");
        let args = InitArgs {
            output: output.display().to_string(),
            generate_key: true,
            force: false,
        };
        assert_eq!(args.execute().await.unwrap(), 0);

        let content = fs::read_to_string(&output).unwrap();
        assert!(!content.contains("${FIELDSYNC_STORE_KEY}"));
        let config: FieldSyncConfig = toml::from_str(&content).unwrap();
        config.validate().unwrap();
    }
}
