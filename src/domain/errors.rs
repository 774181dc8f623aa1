//! Domain error types
//!
//! This module defines the error hierarchy for fieldsync. Local errors
//! (validation, decryption, store) are handled where they occur; remote errors
//! carry enough classification for the sync engine to decide whether a record
//! is retried or parked as failed. No third-party error types leak through.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Main fieldsync error type
///
/// This is the primary error type used throughout the library.
#[derive(Debug, Error)]
pub enum FieldSyncError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Missing or invalid required fields on a local record
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Stored ciphertext could not be decrypted
    #[error(transparent)]
    Decryption(#[from] DecryptionError),

    /// Errors raised while talking to the remote collaborator
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Submission deferred until a session is established
    #[error(transparent)]
    AuthRequired(#[from] AuthRequiredError),

    /// Local store errors
    #[error("Store error: {0}")]
    Store(String),

    /// A record status change outside the lifecycle state machine
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// Record not found in the local store
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Login identifier rejected by its resolver
    #[error("Invalid login: {0}")]
    InvalidLogin(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl FieldSyncError {
    /// Whether the operation that produced this error may succeed if repeated
    /// unchanged. Only transient remote failures qualify.
    pub fn is_retryable(&self) -> bool {
        match self {
            FieldSyncError::Remote(e) => e.is_retryable(),
            _ => false,
        }
    }
}

/// Required fields missing on a record
///
/// Lists every missing field, not just the first one encountered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Validation error: missing required fields: {}", missing.join(", "))]
pub struct ValidationError {
    /// Names of the missing or invalid fields
    pub missing: Vec<String>,
}

impl ValidationError {
    /// Creates a validation error for the given field names
    pub fn new(missing: Vec<String>) -> Self {
        Self { missing }
    }

    /// Checks whether a specific field was reported
    pub fn contains(&self, field: &str) -> bool {
        self.missing.iter().any(|f| f == field)
    }
}

/// Stored ciphertext could not be turned back into plaintext
///
/// Raised for corrupted ciphertext or a key mismatch. Never masked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Decryption error for {context}: {reason}")]
pub struct DecryptionError {
    /// What was being decrypted (record id, settings, held form)
    pub context: String,

    /// Why decryption failed
    pub reason: String,
}

impl DecryptionError {
    /// Creates a new decryption error
    pub fn new(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            reason: reason.into(),
        }
    }
}

/// Remote collaborator errors
///
/// These errors don't expose the HTTP client's types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Connection could not be established or was dropped
    #[error("Network error: {0}")]
    Network(String),

    /// Request exceeded the transport timeout
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Server error (5xx)
    #[error("Server error: {status} - {message}")]
    Server { status: u16, message: String },

    /// Server rejected the record content (4xx other than auth)
    #[error("Rejected by server ({status}): {reason}")]
    Rejected { status: u16, reason: String },

    /// Missing or invalid bearer token
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Response body did not match the expected contract
    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),
}

impl RemoteError {
    /// Network-level failures are retryable; content rejections are not,
    /// because resending unmodified invalid data cannot succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            RemoteError::Network(_)
            | RemoteError::Timeout(_)
            | RemoteError::Server { .. }
            | RemoteError::Unauthorized(_)
            | RemoteError::InvalidResponse(_) => true,
            RemoteError::Rejected { .. } => false,
        }
    }

    /// Whether the failure happened below the application layer
    pub fn is_network_level(&self) -> bool {
        matches!(
            self,
            RemoteError::Network(_) | RemoteError::Timeout(_) | RemoteError::Server { .. }
        )
    }
}

/// Submission deferred pending authentication
///
/// Not a failure: the form state has been held and will be resumed once a
/// session exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Authentication required: submission held at {held_at}")]
pub struct AuthRequiredError {
    /// When the form state was moved to the holding area
    pub held_at: DateTime<Utc>,
}

// Conversion from std::io::Error
impl From<std::io::Error> for FieldSyncError {
    fn from(err: std::io::Error) -> Self {
        FieldSyncError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for FieldSyncError {
    fn from(err: serde_json::Error) -> Self {
        FieldSyncError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for FieldSyncError {
    fn from(err: toml::de::Error) -> Self {
        FieldSyncError::Configuration(format!("TOML parse error: {err}"))
    }
}

// Conversion from sqlx errors
impl From<sqlx::Error> for FieldSyncError {
    fn from(err: sqlx::Error) -> Self {
        FieldSyncError::Store(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_lists_every_field() {
        let err = ValidationError::new(vec!["child_name".to_string(), "consent".to_string()]);
        assert_eq!(
            err.to_string(),
            "Validation error: missing required fields: child_name, consent"
        );
        assert!(err.contains("consent"));
        assert!(!err.contains("age"));
    }

    #[test]
    fn test_validation_error_conversion() {
        let err: FieldSyncError = ValidationError::new(vec!["age".to_string()]).into();
        assert!(matches!(err, FieldSyncError::Validation(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_remote_error_retryability() {
        assert!(RemoteError::Network("reset".to_string()).is_retryable());
        assert!(RemoteError::Timeout("30s".to_string()).is_retryable());
        assert!(RemoteError::Server {
            status: 503,
            message: "unavailable".to_string()
        }
        .is_retryable());
        assert!(!RemoteError::Rejected {
            status: 422,
            reason: "age out of range".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn test_network_level_classification() {
        assert!(RemoteError::Timeout("t".to_string()).is_network_level());
        assert!(!RemoteError::Unauthorized("expired".to_string()).is_network_level());
        assert!(!RemoteError::Rejected {
            status: 400,
            reason: "bad".to_string()
        }
        .is_network_level());
    }

    #[test]
    fn test_remote_error_conversion_keeps_retryability() {
        let err: FieldSyncError = RemoteError::Network("down".to_string()).into();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_decryption_error_display() {
        let err = DecryptionError::new("record 42", "authentication tag mismatch");
        assert_eq!(
            err.to_string(),
            "Decryption error for record 42: authentication tag mismatch"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: FieldSyncError = io_err.into();
        assert!(matches!(err, FieldSyncError::Io(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: FieldSyncError = json_err.into();
        assert!(matches!(err, FieldSyncError::Serialization(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let err: FieldSyncError = toml_err.into();
        assert!(matches!(err, FieldSyncError::Configuration(_)));
        assert!(err.to_string().contains("TOML parse error"));
    }
}
