//! Configuration schema types
//!
//! Every section maps to a table in `fieldsync.toml`. All sections except
//! `[remote]` and `[store]` are optional and fall back to their defaults.

use crate::config::SecretString;
use serde::{Deserialize, Serialize};

/// Runtime environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Development environment
    #[default]
    Development,
    /// Staging environment
    Staging,
    /// Production environment
    Production,
}

/// Root fieldsync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSyncConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Runtime environment (development, staging, production)
    #[serde(default)]
    pub environment: Environment,

    /// Remote collaborator connection
    pub remote: RemoteConfig,

    /// Local encrypted store
    pub store: StoreConfig,

    /// Sync engine behaviour
    #[serde(default)]
    pub sync: SyncConfig,

    /// Connectivity probing
    #[serde(default)]
    pub network: NetworkConfig,

    /// Health ID generation
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Background trigger
    #[serde(default)]
    pub background: BackgroundConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl FieldSyncConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid value found
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.remote.validate(&self.environment)?;
        self.store.validate()?;
        self.sync.validate()?;
        self.network.validate()?;
        self.identity.validate()?;
        self.background.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Remote collaborator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Server root; record endpoints live under `/api/children`
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Connection establishment timeout in seconds
    #[serde(default = "default_connect_timeout_seconds")]
    pub connect_timeout_seconds: u64,

    /// TLS certificate verification
    ///
    /// Must stay `true` in production; validation refuses anything else.
    #[serde(default = "default_true")]
    pub tls_verify: bool,
}

impl RemoteConfig {
    fn validate(&self, environment: &Environment) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("remote.base_url cannot be empty".to_string());
        }

        let parsed = url::Url::parse(&self.base_url)
            .map_err(|e| format!("remote.base_url is not a valid URL: {e}"))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err("remote.base_url must start with http:// or https://".to_string());
        }

        if self.timeout_seconds == 0 {
            return Err("remote.timeout_seconds must be > 0".to_string());
        }
        if self.connect_timeout_seconds == 0 {
            return Err("remote.connect_timeout_seconds must be > 0".to_string());
        }

        if *environment == Environment::Production {
            if !self.tls_verify {
                return Err(
                    "TLS certificate verification cannot be disabled in production environments. \
                    Set 'tls_verify = true' or use environment = \"development\" for local testing."
                        .to_string(),
                );
            }
            if parsed.scheme() == "http" {
                return Err(
                    "remote.base_url must use https:// in production environments".to_string(),
                );
            }
        }

        Ok(())
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            timeout_seconds: default_timeout_seconds(),
            connect_timeout_seconds: default_connect_timeout_seconds(),
            tls_verify: true,
        }
    }
}

/// Local encrypted store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database file, or `:memory:`
    #[serde(default = "default_store_path")]
    pub path: String,

    /// Key for field encryption
    ///
    /// Either base64 of exactly 32 bytes, or a passphrase that is hashed
    /// down to a key. Stored securely in memory and zeroized on drop.
    pub encryption_key: SecretString,
}

impl StoreConfig {
    fn validate(&self) -> Result<(), String> {
        use secrecy::ExposeSecret;

        if self.path.trim().is_empty() {
            return Err("store.path cannot be empty".to_string());
        }
        if self.encryption_key.expose_secret().is_empty() {
            return Err("store.encryption_key cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Retry configuration for individual uploads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts per record within one pass (including the first)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Backoff multiplier
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("sync.retry.max_attempts must be > 0".to_string());
        }
        if self.backoff_multiplier < 1.0 {
            return Err("sync.retry.backoff_multiplier must be >= 1.0".to_string());
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err("sync.retry.initial_delay_ms cannot exceed max_delay_ms".to_string());
        }
        Ok(())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

/// Sync engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// A record whose retry count exceeds this is parked as failed
    #[serde(default = "default_max_record_retries")]
    pub max_record_retries: u32,

    /// Pause between sequential individual uploads
    #[serde(default = "default_inter_request_delay_ms")]
    pub inter_request_delay_ms: u64,

    /// Sync automatically when connectivity is restored
    #[serde(default = "default_true")]
    pub auto_sync: bool,

    /// In-pass retry policy for individual uploads
    #[serde(default)]
    pub retry: RetryConfig,
}

impl SyncConfig {
    fn validate(&self) -> Result<(), String> {
        if self.max_record_retries == 0 {
            return Err("sync.max_record_retries must be > 0".to_string());
        }
        if self.inter_request_delay_ms > 60_000 {
            return Err("sync.inter_request_delay_ms must be <= 60000".to_string());
        }
        self.retry.validate()
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_record_retries: default_max_record_retries(),
            inter_request_delay_ms: default_inter_request_delay_ms(),
            auto_sync: true,
            retry: RetryConfig::default(),
        }
    }
}

/// Connectivity probe configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Seconds between periodic probes
    #[serde(default = "default_probe_interval_seconds")]
    pub probe_interval_seconds: u64,

    /// Probe timeout; a probe slower than this counts as offline
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Latency at or below this is `good`
    #[serde(default = "default_good_latency_ms")]
    pub good_latency_ms: u64,

    /// Latency above this is `poor`
    #[serde(default = "default_poor_latency_ms")]
    pub poor_latency_ms: u64,
}

impl NetworkConfig {
    fn validate(&self) -> Result<(), String> {
        if self.probe_interval_seconds == 0 {
            return Err("network.probe_interval_seconds must be > 0".to_string());
        }
        if self.probe_timeout_ms == 0 {
            return Err("network.probe_timeout_ms must be > 0".to_string());
        }
        if self.good_latency_ms >= self.poor_latency_ms {
            return Err("network.good_latency_ms must be < network.poor_latency_ms".to_string());
        }
        Ok(())
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            probe_interval_seconds: default_probe_interval_seconds(),
            probe_timeout_ms: default_probe_timeout_ms(),
            good_latency_ms: default_good_latency_ms(),
            poor_latency_ms: default_poor_latency_ms(),
        }
    }
}

/// Health ID generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Alphabetic prefix of every generated health ID
    #[serde(default = "default_health_id_prefix")]
    pub health_id_prefix: String,

    /// Regenerate on collision with an ID already in the local store
    #[serde(default)]
    pub check_local_uniqueness: bool,
}

impl IdentityConfig {
    fn validate(&self) -> Result<(), String> {
        if self.health_id_prefix.is_empty() {
            return Err("identity.health_id_prefix cannot be empty".to_string());
        }
        if !self
            .health_id_prefix
            .chars()
            .all(|c| c.is_ascii_uppercase())
        {
            return Err(format!(
                "identity.health_id_prefix '{}' must contain only uppercase letters",
                self.health_id_prefix
            ));
        }
        Ok(())
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            health_id_prefix: default_health_id_prefix(),
            check_local_uniqueness: false,
        }
    }
}

/// Background trigger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackgroundConfig {
    /// Tag the background worker responds to
    #[serde(default = "default_sync_tag")]
    pub sync_tag: String,
}

impl BackgroundConfig {
    fn validate(&self) -> Result<(), String> {
        if self.sync_tag.trim().is_empty() {
            return Err("background.sync_tag cannot be empty".to_string());
        }
        Ok(())
    }
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            sync_tag: default_sync_tag(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default = "default_true")]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy (daily, hourly, never)
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }
        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path cannot be empty when local logging is enabled".to_string());
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: true,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_connect_timeout_seconds() -> u64 {
    10
}

fn default_store_path() -> String {
    "fieldsync.db".to_string()
}

fn default_max_attempts() -> usize {
    3
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    10_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_max_record_retries() -> u32 {
    5
}

fn default_inter_request_delay_ms() -> u64 {
    250
}

fn default_probe_interval_seconds() -> u64 {
    30
}

fn default_probe_timeout_ms() -> u64 {
    5_000
}

fn default_good_latency_ms() -> u64 {
    300
}

fn default_poor_latency_ms() -> u64 {
    1_500
}

fn default_health_id_prefix() -> String {
    "CHR".to_string()
}

fn default_sync_tag() -> String {
    "sync-records".to_string()
}

fn default_local_path() -> String {
    "./logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}
