//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{Environment, FieldSyncConfig};
use super::secret::secret_string;
use crate::domain::errors::FieldSyncError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Substitutes `${VAR}` placeholders from the environment
/// 3. Parses the TOML into [`FieldSyncConfig`]
/// 4. Applies `FIELDSYNC_*` environment overrides
/// 5. Validates the result
///
/// # Errors
///
/// Returns [`FieldSyncError::Configuration`] if the file is missing or
/// unreadable, a referenced variable is unset, parsing fails, or validation
/// fails.
///
/// # Examples
///
/// ```no_run
/// use fieldsync::config::loader::load_config;
///
/// let config = load_config("fieldsync.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<FieldSyncConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(FieldSyncError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        FieldSyncError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    load_config_from_str(&contents)
}

/// Same as [`load_config`], for configuration already in memory
pub fn load_config_from_str(contents: &str) -> Result<FieldSyncConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: FieldSyncConfig = toml::from_str(&contents)
        .map_err(|e| FieldSyncError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        FieldSyncError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format `${VAR_NAME}`
///
/// Comment lines are copied through untouched. Every unset variable is
/// reported in one error.
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| FieldSyncError::Other(format!("invalid placeholder pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{}}}", var_name);
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(FieldSyncError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Parses an override value, naming the variable on failure
fn parse_override<T: std::str::FromStr>(name: &str, val: &str) -> Result<T> {
    val.parse().map_err(|_| {
        FieldSyncError::Configuration(format!("Invalid value '{val}' for environment variable {name}"))
    })
}

/// Applies environment variable overrides using the `FIELDSYNC_*` prefix
///
/// Variables follow the pattern `FIELDSYNC_<SECTION>_<KEY>`, for example
/// `FIELDSYNC_REMOTE_BASE_URL` or `FIELDSYNC_SYNC_MAX_RECORD_RETRIES`.
fn apply_env_overrides(config: &mut FieldSyncConfig) -> Result<()> {
    fn var(name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    // Application
    if let Some(val) = var("FIELDSYNC_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Some(val) = var("FIELDSYNC_ENVIRONMENT") {
        config.environment = match val.to_lowercase().as_str() {
            "development" => Environment::Development,
            "staging" => Environment::Staging,
            "production" => Environment::Production,
            other => {
                return Err(FieldSyncError::Configuration(format!(
                    "Invalid value '{other}' for environment variable FIELDSYNC_ENVIRONMENT"
                )))
            }
        };
    }

    // Remote
    if let Some(val) = var("FIELDSYNC_REMOTE_BASE_URL") {
        config.remote.base_url = val;
    }
    if let Some(val) = var("FIELDSYNC_REMOTE_TIMEOUT_SECONDS") {
        config.remote.timeout_seconds = parse_override("FIELDSYNC_REMOTE_TIMEOUT_SECONDS", &val)?;
    }
    if let Some(val) = var("FIELDSYNC_REMOTE_TLS_VERIFY") {
        config.remote.tls_verify = parse_override("FIELDSYNC_REMOTE_TLS_VERIFY", &val)?;
    }

    // Store
    if let Some(val) = var("FIELDSYNC_STORE_PATH") {
        config.store.path = val;
    }
    if let Some(val) = var("FIELDSYNC_STORE_ENCRYPTION_KEY") {
        config.store.encryption_key = secret_string(val);
    }

    // Sync
    if let Some(val) = var("FIELDSYNC_SYNC_MAX_RECORD_RETRIES") {
        config.sync.max_record_retries =
            parse_override("FIELDSYNC_SYNC_MAX_RECORD_RETRIES", &val)?;
    }
    if let Some(val) = var("FIELDSYNC_SYNC_INTER_REQUEST_DELAY_MS") {
        config.sync.inter_request_delay_ms =
            parse_override("FIELDSYNC_SYNC_INTER_REQUEST_DELAY_MS", &val)?;
    }
    if let Some(val) = var("FIELDSYNC_SYNC_AUTO_SYNC") {
        config.sync.auto_sync = parse_override("FIELDSYNC_SYNC_AUTO_SYNC", &val)?;
    }

    // Network
    if let Some(val) = var("FIELDSYNC_NETWORK_PROBE_INTERVAL_SECONDS") {
        config.network.probe_interval_seconds =
            parse_override("FIELDSYNC_NETWORK_PROBE_INTERVAL_SECONDS", &val)?;
    }

    // Identity
    if let Some(val) = var("FIELDSYNC_IDENTITY_HEALTH_ID_PREFIX") {
        config.identity.health_id_prefix = val;
    }

    // Background
    if let Some(val) = var("FIELDSYNC_BACKGROUND_SYNC_TAG") {
        config.background.sync_tag = val;
    }

    // Logging
    if let Some(val) = var("FIELDSYNC_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = parse_override("FIELDSYNC_LOGGING_LOCAL_ENABLED", &val)?;
    }
    if let Some(val) = var("FIELDSYNC_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const MINIMAL: &str = r#"
[remote]
base_url = "https://api.example.org"

[store]
path = ":memory:"
encryption_key = "field-key"
"#;

    #[test]
    fn test_substitute_env_vars() {
        let _guard = ENV_MUTEX.lock().unwrap();
        std::env::set_var("FS_LOADER_TEST_KEY", "s3cret");
        let result = substitute_env_vars("encryption_key = \"${FS_LOADER_TEST_KEY}\"").unwrap();
        assert_eq!(result, "encryption_key = \"s3cret\"\n");
        std::env::remove_var("FS_LOADER_TEST_KEY");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        let _guard = ENV_MUTEX.lock().unwrap();
        std::env::remove_var("FS_LOADER_MISSING_ONE");
        std::env::remove_var("FS_LOADER_MISSING_TWO");
        let err = substitute_env_vars("a = \"${FS_LOADER_MISSING_ONE}\"\nb = \"${FS_LOADER_MISSING_TWO}\"")
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("FS_LOADER_MISSING_ONE"));
        assert!(message.contains("FS_LOADER_MISSING_TWO"));
    }

    #[test]
    fn test_substitute_skips_comment_lines() {
        let _guard = ENV_MUTEX.lock().unwrap();
        std::env::remove_var("FS_LOADER_COMMENTED");
        let input = "# key = \"${FS_LOADER_COMMENTED}\"";
        assert_eq!(substitute_env_vars(input).unwrap(), format!("{input}\n"));
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent-fieldsync.toml");
        assert!(matches!(result, Err(FieldSyncError::Configuration(_))));
    }

    #[test]
    fn test_load_config_valid() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(MINIMAL.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.remote.base_url, "https://api.example.org");
        assert_eq!(config.store.encryption_key.expose_secret(), "field-key");
    }

    #[test]
    fn test_env_override_applied_and_validated() {
        let _guard = ENV_MUTEX.lock().unwrap();
        std::env::set_var("FIELDSYNC_SYNC_MAX_RECORD_RETRIES", "9");
        let config = load_config_from_str(MINIMAL).unwrap();
        assert_eq!(config.sync.max_record_retries, 9);

        std::env::set_var("FIELDSYNC_SYNC_MAX_RECORD_RETRIES", "lots");
        assert!(load_config_from_str(MINIMAL).is_err());
        std::env::remove_var("FIELDSYNC_SYNC_MAX_RECORD_RETRIES");
    }
}
