//! Validate config command implementation

use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // load_config validates after parsing and applying overrides
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration is invalid");
                println!("   Error: {e}");
                return Ok(super::EXIT_CONFIG);
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Environment: {:?}", config.environment);
        println!("  Log Level: {}", config.application.log_level);
        println!("  Remote: {}", config.remote.base_url);
        println!("  TLS Verify: {}", config.remote.tls_verify);
        println!("  Store: {}", config.store.path);
        println!("  Max Record Retries: {}", config.sync.max_record_retries);
        println!("  Inter-request Delay: {}ms", config.sync.inter_request_delay_ms);
        println!("  Auto Sync: {}", config.sync.auto_sync);
        println!("  Probe Interval: {}s", config.network.probe_interval_seconds);
        println!("  Health ID Prefix: {}", config.identity.health_id_prefix);
        println!("  Background Sync Tag: {}", config.background.sync_tag);
        println!();
        Ok(super::EXIT_OK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_invalid_file_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not = valid = toml").unwrap();

        let code = ValidateArgs {}
            .execute(&file.path().display().to_string())
            .await
            .unwrap();
        assert_eq!(code, super::super::EXIT_CONFIG);
    }
}
