//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for fieldsync using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// fieldsync - offline-first health record capture and sync
#[derive(Parser, Debug)]
#[command(name = "fieldsync")]
#[command(version, about, long_about = None)]
#[command(author = "fieldsync Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "fieldsync.toml", env = "FIELDSYNC_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "FIELDSYNC_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new configuration file
    Init(commands::init::InitArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Show queue counts, session and remote reachability
    Status(commands::status::StatusArgs),

    /// Store a record from a JSON form
    Submit(commands::submit::SubmitArgs),

    /// Sign in and resume a held submission
    Login(commands::login::LoginArgs),

    /// Sign out
    Logout(commands::login::LogoutArgs),

    /// Upload pending records now
    Sync(commands::sync::SyncArgs),

    /// Requeue failed records
    Retry(commands::retry::RetryArgs),

    /// Delete records from the local store
    Purge(commands::purge::PurgeArgs),

    /// Run the background sync worker until interrupted
    Worker(commands::worker::WorkerArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_sync() {
        let cli = Cli::parse_from(["fieldsync", "sync"]);
        assert_eq!(cli.config, "fieldsync.toml");
        assert!(matches!(cli.command, Commands::Sync(_)));
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from(["fieldsync", "--config", "custom.toml", "status"]);
        assert_eq!(cli.config, "custom.toml");
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["fieldsync", "--log-level", "debug", "sync"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_cli_parse_validate_config() {
        let cli = Cli::parse_from(["fieldsync", "validate-config"]);
        assert!(matches!(cli.command, Commands::ValidateConfig(_)));
    }

    #[test]
    fn test_cli_parse_submit_draft() {
        let cli = Cli::parse_from(["fieldsync", "submit", "form.json", "--draft"]);
        match cli.command {
            Commands::Submit(args) => {
                assert_eq!(args.form, "form.json");
                assert!(args.draft);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_login() {
        let cli = Cli::parse_from([
            "fieldsync", "login", "--kind", "uin", "--value", "1234 5678 9012", "--token", "t0k",
        ]);
        match cli.command {
            Commands::Login(args) => {
                assert_eq!(args.kind, "uin");
                assert_eq!(args.token, "t0k");
                assert!(args.ttl_hours.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_retry_requires_target() {
        assert!(Cli::try_parse_from(["fieldsync", "retry"]).is_err());
        assert!(Cli::try_parse_from(["fieldsync", "retry", "--id", "a", "--all"]).is_err());
        assert!(Cli::try_parse_from(["fieldsync", "retry", "--all", "--sync"]).is_ok());
    }

    #[test]
    fn test_cli_purge_requires_target() {
        assert!(Cli::try_parse_from(["fieldsync", "purge"]).is_err());
        assert!(Cli::try_parse_from(["fieldsync", "purge", "--synced"]).is_ok());
    }

    #[test]
    fn test_cli_parse_worker() {
        let cli = Cli::parse_from(["fieldsync", "worker", "--tag", "nightly"]);
        match cli.command {
            Commands::Worker(args) => assert_eq!(args.tag.as_deref(), Some("nightly")),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
