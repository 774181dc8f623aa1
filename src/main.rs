// fieldsync - Offline-first health record capture and sync
// Copyright (c) 2025 fieldsync Contributors
// Licensed under the MIT License

use clap::Parser;
use fieldsync::cli::{Cli, Commands};
use fieldsync::config::{load_config, LoggingConfig};
use fieldsync::logging::init_logging;
use std::process;
use tokio::sync::watch;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // One-shot commands log to the console only; the long-running worker
    // also writes the configured log files when the config loads
    let log_level = cli.log_level.as_deref().unwrap_or("info");
    let logging_config = match &cli.command {
        Commands::Worker(_) => load_config(&cli.config)
            .map(|config| config.logging)
            .unwrap_or_else(|_| console_only()),
        _ => console_only(),
    };
    let logging_guard = match init_logging(log_level, &logging_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(5);
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "fieldsync - offline-first health record sync"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(wait_for_signal(shutdown_tx.clone()));

    let exit_code = match execute_command(&cli, shutdown_rx).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command execution failed");
            eprintln!("Error: {e}");
            5
        }
    };

    drop(logging_guard);
    process::exit(exit_code);
}

fn console_only() -> LoggingConfig {
    LoggingConfig {
        local_enabled: false,
        local_path: String::new(),
        local_rotation: "never".to_string(),
    }
}

async fn wait_for_signal(shutdown_tx: watch::Sender<bool>) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => Some(s),
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable; Ctrl+C only");
                None
            }
        };

        let received = match sigterm.as_mut() {
            Some(sigterm) => tokio::select! {
                r = tokio::signal::ctrl_c() => r.map(|_| "SIGINT"),
                _ = sigterm.recv() => Ok("SIGTERM"),
            },
            None => tokio::signal::ctrl_c().await.map(|_| "SIGINT"),
        };

        match received {
            Ok(name) => {
                tracing::info!(signal = name, "Shutdown signal received");
                println!("\n⚠️  Shutdown signal received, finishing the current record...");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C"),
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        } else {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
            println!("\n⚠️  Shutdown signal received, finishing the current record...");
            let _ = shutdown_tx.send(true);
        }
    }
}

/// Execute the CLI command
async fn execute_command(cli: &Cli, shutdown_signal: watch::Receiver<bool>) -> anyhow::Result<i32> {
    match &cli.command {
        Commands::Init(args) => args.execute().await,
        Commands::ValidateConfig(args) => args.execute(&cli.config).await,
        Commands::Status(args) => args.execute(&cli.config).await,
        Commands::Submit(args) => args.execute(&cli.config).await,
        Commands::Login(args) => args.execute(&cli.config).await,
        Commands::Logout(args) => args.execute(&cli.config).await,
        Commands::Sync(args) => args.execute(&cli.config, shutdown_signal).await,
        Commands::Retry(args) => args.execute(&cli.config, shutdown_signal).await,
        Commands::Purge(args) => args.execute(&cli.config).await,
        Commands::Worker(args) => args.execute(&cli.config, shutdown_signal).await,
    }
}
