//! Configuration management for fieldsync.
//!
//! Configuration comes from a TOML file with:
//! - `${VAR_NAME}` environment substitution (comment lines are skipped)
//! - `FIELDSYNC_<SECTION>_<KEY>` environment overrides
//! - defaults for every optional section
//! - validation on load
//!
//! # Example Configuration
//!
//! ```toml
//! environment = "production"
//!
//! [application]
//! log_level = "info"
//!
//! [remote]
//! base_url = "https://records.example.org"
//! timeout_seconds = 30
//!
//! [store]
//! path = "/var/lib/fieldsync/records.db"
//! encryption_key = "${FIELDSYNC_KEY}"
//!
//! [sync]
//! max_record_retries = 5
//! inter_request_delay_ms = 250
//! ```
//!
//! ```rust,no_run
//! use fieldsync::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("fieldsync.toml")?;
//! println!("Remote: {}", config.remote.base_url);
//! # Ok(())
//! # }
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::{load_config, load_config_from_str};
pub use schema::{
    ApplicationConfig, BackgroundConfig, Environment, FieldSyncConfig, IdentityConfig,
    LoggingConfig, NetworkConfig, RemoteConfig, RetryConfig, StoreConfig, SyncConfig,
};
pub use secret::{secret_string, SecretString, SecretValue};
