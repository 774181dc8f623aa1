//! Health identifier generation
//!
//! A health ID is `prefix + YYYYMMDD + initials + suffix`: up to three
//! uppercase initials taken from the child's name and a four-character
//! random base36 suffix. Nothing here guarantees uniqueness. Date, initials
//! and 36^4 random suffixes make collisions unlikely, not impossible. When
//! `identity.check_local_uniqueness` is set, the generator also re-rolls
//! against the local store's health-id index, which still cannot see records
//! created on other devices.

use crate::adapters::store::RecordStore;
use crate::config::IdentityConfig;
use crate::domain::{FieldSyncError, HealthId, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;

use crate::domain::ids::HEALTH_ID_SUFFIX_LEN;

/// Prefix used when none is configured
pub const DEFAULT_PREFIX: &str = "CHR";

const MAX_INITIALS: usize = 3;
const BASE36: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// How many suffixes are tried before the local uniqueness check gives up
const MAX_UNIQUE_ATTEMPTS: usize = 8;

/// Generates a health ID from a name and an RFC 3339 or `YYYY-MM-DD` timestamp
///
/// # Examples
///
/// ```
/// use fieldsync::core::identity::generate_health_id;
///
/// let id = generate_health_id("Asha Kumari", "2024-03-15T09:30:00Z").unwrap();
/// assert!(id.as_str().starts_with("CHR20240315AK"));
/// assert_eq!(id.as_str().len(), "CHR20240315AK".len() + 4);
/// ```
pub fn generate_health_id(name: &str, timestamp: &str) -> Result<HealthId> {
    let date = parse_date(timestamp)?;
    compose(DEFAULT_PREFIX, date, name)
}

/// Extracts up to three uppercase initials from a name
///
/// Takes the first ASCII letter of each whitespace-separated word. Words
/// without one are skipped.
pub fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|word| word.chars().find(|c| c.is_ascii_alphabetic()))
        .take(MAX_INITIALS)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

fn random_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..HEALTH_ID_SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}

fn parse_date(timestamp: &str) -> Result<NaiveDate> {
    let trimmed = timestamp.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc).date_naive());
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|_| {
        FieldSyncError::Other(format!(
            "Invalid timestamp '{timestamp}': expected RFC 3339 or YYYY-MM-DD"
        ))
    })
}

fn compose(prefix: &str, date: NaiveDate, name: &str) -> Result<HealthId> {
    let id = format!(
        "{prefix}{}{}{}",
        date.format("%Y%m%d"),
        initials(name),
        random_suffix()
    );
    HealthId::new(id).map_err(FieldSyncError::Other)
}

/// Configured health ID generator
#[derive(Debug, Clone)]
pub struct HealthIdGenerator {
    prefix: String,
    check_local_uniqueness: bool,
}

impl HealthIdGenerator {
    pub fn new(config: &IdentityConfig) -> Self {
        Self {
            prefix: config.health_id_prefix.clone(),
            check_local_uniqueness: config.check_local_uniqueness,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Generates an identifier for a record created at `at`
    pub fn generate(&self, name: &str, at: &DateTime<Utc>) -> Result<HealthId> {
        compose(&self.prefix, at.date_naive(), name)
    }

    /// Generates an identifier, re-rolling the suffix while the local store
    /// already holds it (only when the uniqueness check is enabled)
    pub async fn generate_checked(
        &self,
        name: &str,
        at: &DateTime<Utc>,
        store: &dyn RecordStore,
    ) -> Result<HealthId> {
        if !self.check_local_uniqueness {
            return self.generate(name, at);
        }

        for attempt in 1..=MAX_UNIQUE_ATTEMPTS {
            let candidate = self.generate(name, at)?;
            if !store.health_id_exists(&candidate).await? {
                return Ok(candidate);
            }
            tracing::warn!(
                health_id = %candidate,
                attempt = attempt,
                "Generated health ID already present locally, regenerating"
            );
        }

        Err(FieldSyncError::Other(format!(
            "Could not generate a locally unique health ID after {MAX_UNIQUE_ATTEMPTS} attempts"
        )))
    }
}

impl Default for HealthIdGenerator {
    fn default() -> Self {
        Self::new(&IdentityConfig::default())
    }
}
