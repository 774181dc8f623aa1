//! Domain identifier types with validation
//!
//! Newtype wrappers keep the three identifiers a record carries from being
//! mixed up: the local id, the human-decodable health id, and the id the
//! remote collaborator assigns after a successful sync.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Local record identifier
///
/// Generated on the device at creation time and never changed afterwards.
///
/// # Examples
///
/// ```
/// use fieldsync::domain::ids::RecordId;
///
/// let a = RecordId::generate();
/// let b = RecordId::generate();
/// assert_ne!(a, b);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(String);

impl RecordId {
    /// Generates a fresh random identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Creates a RecordId from an existing string
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Record ID cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Returns the record ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for RecordId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Health identifier
///
/// Format: `{prefix}{YYYYMMDD}{initials}{suffix}` where initials are up to
/// three uppercase letters and the suffix is four base36 characters. The
/// prefix is configurable and must be alphabetic, so the date is the first
/// digit run in the string.
///
/// # Examples
///
/// ```
/// use fieldsync::domain::ids::HealthId;
/// use std::str::FromStr;
///
/// let id = HealthId::from_str("CHR20240315AKX7Q2").unwrap();
/// let parts = id.decode().unwrap();
/// assert_eq!(parts.prefix, "CHR");
/// assert_eq!(parts.initials, "AK");
/// assert_eq!(parts.suffix, "X7Q2");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HealthId(String);

/// Decoded components of a [`HealthId`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthIdParts {
    /// Alphabetic prefix
    pub prefix: String,

    /// Calendar date the record was created
    pub date: NaiveDate,

    /// Up to three uppercase name initials
    pub initials: String,

    /// Four-character random base36 suffix
    pub suffix: String,
}

/// Length of the random suffix
pub const HEALTH_ID_SUFFIX_LEN: usize = 4;

impl HealthId {
    /// Creates a HealthId, checking only that it is non-empty
    ///
    /// Identifiers received from other systems are accepted as-is;
    /// use [`HealthId::decode`] to inspect the structure.
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Health ID cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Returns the health ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Splits the identifier into its human-readable parts
    pub fn decode(&self) -> Result<HealthIdParts, String> {
        let s = self.0.as_str();
        let date_start = s
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| format!("Health ID '{s}' has no date component"))?;

        let prefix = &s[..date_start];
        let rest = &s[date_start..];
        if rest.len() < 8 + HEALTH_ID_SUFFIX_LEN || !rest.is_char_boundary(8) {
            return Err(format!("Health ID '{s}' is too short"));
        }

        let date = NaiveDate::parse_from_str(&rest[..8], "%Y%m%d")
            .map_err(|e| format!("Health ID '{s}' has an invalid date: {e}"))?;

        let tail = &rest[8..];
        let split = tail.len() - HEALTH_ID_SUFFIX_LEN;
        if !tail.is_char_boundary(split) {
            return Err(format!("Health ID '{s}' has an invalid suffix"));
        }
        let (initials, suffix) = tail.split_at(split);

        if initials.len() > 3 || !initials.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(format!("Health ID '{s}' has invalid initials '{initials}'"));
        }
        if !suffix
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        {
            return Err(format!("Health ID '{s}' has a non-base36 suffix"));
        }

        Ok(HealthIdParts {
            prefix: prefix.to_string(),
            date,
            initials: initials.to_string(),
            suffix: suffix.to_string(),
        })
    }
}

impl fmt::Display for HealthId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for HealthId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for HealthId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identifier assigned by the remote collaborator
///
/// Only present on records that have been synced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerId(String);

impl ServerId {
    /// Creates a new ServerId from a string
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Server ID cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Returns the server ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ServerId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_rejects_empty() {
        assert!(RecordId::new("").is_err());
        assert!(RecordId::new("   ").is_err());
        assert!(RecordId::new("abc").is_ok());
    }

    #[test]
    fn test_record_id_generate_is_uuid() {
        let id = RecordId::generate();
        assert!(Uuid::parse_str(id.as_str()).is_ok());
    }

    #[test]
    fn test_health_id_decode_full() {
        let id = HealthId::new("CHR20240315ASKZ9Q1").unwrap();
        let parts = id.decode().unwrap();
        assert_eq!(parts.prefix, "CHR");
        assert_eq!(parts.date, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        assert_eq!(parts.initials, "ASK");
        assert_eq!(parts.suffix, "Z9Q1");
    }

    #[test]
    fn test_health_id_decode_without_initials() {
        let id = HealthId::new("CHR20240315Z9Q1").unwrap();
        let parts = id.decode().unwrap();
        assert_eq!(parts.initials, "");
        assert_eq!(parts.suffix, "Z9Q1");
    }

    #[test]
    fn test_health_id_decode_rejects_bad_date() {
        let id = HealthId::new("CHR20241399ABZ9Q1").unwrap();
        assert!(id.decode().is_err());
    }

    #[test]
    fn test_health_id_decode_rejects_too_many_initials() {
        let id = HealthId::new("CHR20240315ABCDZ9Q1").unwrap();
        assert!(id.decode().is_err());
    }

    #[test]
    fn test_server_id_display() {
        let id = ServerId::new("65f1c2").unwrap();
        assert_eq!(id.to_string(), "65f1c2");
    }
}
