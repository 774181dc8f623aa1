// fieldsync - Offline-first health record capture and sync
// Copyright (c) 2025 fieldsync Contributors
// Licensed under the MIT License

//! # fieldsync - offline-first health record sync
//!
//! fieldsync keeps child health records captured in the field safe on the
//! device until they reach the records server.
//!
//! ## Overview
//!
//! This library provides:
//! - **Storing** records locally with sensitive fields encrypted at rest
//! - **Identifying** each child with a human-readable health ID
//! - **Tracking** every record through `draft -> pending -> synced | failed`
//! - **Syncing** pending records in one batch, falling back to one-by-one
//!   uploads when the batch fails in transit
//! - **Gating** online submissions behind a signed-in session
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Lifecycle, identity, network, auth, sync and background triggers
//! - [`adapters`] - Encrypted SQLite store and HTTP remote collaborator
//! - [`domain`] - Records, identifiers and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fieldsync::config::load_config;
//! use fieldsync::core::context::EngineContext;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("fieldsync.toml")?;
//!     let context = EngineContext::init(config).await?;
//!
//!     if let Some(summary) = context.sync_now().await?.summary() {
//!         println!("Synced {} of {}", summary.synced, summary.total);
//!     }
//!
//!     context.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Errors
//!
//! Every fallible call returns [`domain::FieldSyncError`]. Remote failures
//! carry a retry classification: network-level failures keep a record queued,
//! content rejections park it as `failed` with the server's reason.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
