//! SQLite implementation of [`RecordStore`]
//!
//! One database file holds three tables: `records` (metadata in clear plus a
//! single encrypted `sensitive` column), `settings` (one encrypted blob) and
//! `form_drafts` (at most one encrypted held form). The schema version lives
//! in `PRAGMA user_version`.

use super::cipher::FieldCipher;
use super::traits::{HeldForm, MetadataPatch, MetadataUpdate, RecordFilter, RecordStore};
use crate::config::StoreConfig;
use crate::domain::{
    ChildDetails, FieldSyncError, HealthId, Record, RecordId, RecordMetadata, RecordStatus,
    Result, SensitiveFields, ServerId, SubmissionMode, Timestamps,
};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::Row;
use std::str::FromStr;
use std::time::Duration;

/// Current schema version
pub const SCHEMA_VERSION: i64 = 1;

const MEMORY_PATH: &str = ":memory:";
const SETTINGS_KEY: &str = "app";

const META_COLUMNS: &str = "id, health_id, server_id, status, submission_mode, retry_count, \
     last_error, consent, details, submitted_by, created_at, updated_at, synced_at";

/// Record store backed by a SQLite database
pub struct SqliteRecordStore {
    pool: SqlitePool,
    cipher: FieldCipher,
}

impl SqliteRecordStore {
    /// Opens (creating if needed) the database described by `config`
    pub async fn open(config: &StoreConfig) -> Result<Self> {
        let cipher = FieldCipher::from_secret(&config.encryption_key)?;
        Self::open_with_cipher(&config.path, cipher).await
    }

    /// Opens the database at `path` with an explicit cipher
    pub async fn open_with_cipher(path: &str, cipher: FieldCipher) -> Result<Self> {
        let in_memory = path == MEMORY_PATH;

        let base = if in_memory {
            SqliteConnectOptions::from_str("sqlite::memory:")?
        } else {
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
        };
        let options = base
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true);

        // An in-memory database lives only as long as its single connection
        let pool = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(4)
                .connect_with(options)
                .await?
        };

        let store = Self { pool, cipher };
        store.initialize_schema().await?;

        tracing::debug!(path = %path, "Record store opened");
        Ok(store)
    }

    async fn initialize_schema(&self) -> Result<()> {
        let version: i64 = sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(&self.pool)
            .await?;
        if version > SCHEMA_VERSION {
            return Err(FieldSyncError::Store(format!(
                "database schema version {version} is newer than supported version {SCHEMA_VERSION}"
            )));
        }
        if version == SCHEMA_VERSION {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                id TEXT PRIMARY KEY,
                health_id TEXT NOT NULL,
                server_id TEXT,
                status TEXT NOT NULL,
                submission_mode TEXT NOT NULL,
                retry_count INTEGER NOT NULL DEFAULT 0,
                last_error TEXT,
                consent INTEGER NOT NULL,
                details TEXT NOT NULL,
                submitted_by TEXT,
                sensitive TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                synced_at TEXT
            )
            "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_records_status ON records(status)")
            .execute(&mut *tx)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_records_health_id ON records(health_id)")
            .execute(&mut *tx)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_records_created ON records(created_at)")
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS form_drafts (
                slot INTEGER PRIMARY KEY CHECK (slot = 0),
                form TEXT NOT NULL,
                held_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(&format!("PRAGMA user_version = {SCHEMA_VERSION}"))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(version = SCHEMA_VERSION, "Record store schema initialized");
        Ok(())
    }

    fn decrypt_row(&self, row: &SqliteRow) -> Result<Record> {
        let meta = row_to_metadata(row)?;
        let envelope: String = row.try_get("sensitive")?;
        let sensitive: SensitiveFields = self
            .cipher
            .open(&envelope, &format!("record {}", meta.id))?;
        Ok(Record { meta, sensitive })
    }
}

fn ts(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_ts(column: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| FieldSyncError::Store(format!("invalid {column} '{value}': {e}")))
}

fn row_to_metadata(row: &SqliteRow) -> Result<RecordMetadata> {
    let id: String = row.try_get("id")?;
    let health_id: String = row.try_get("health_id")?;
    let server_id: Option<String> = row.try_get("server_id")?;
    let status: String = row.try_get("status")?;
    let submission_mode: String = row.try_get("submission_mode")?;
    let retry_count: i64 = row.try_get("retry_count")?;
    let last_error: Option<String> = row.try_get("last_error")?;
    let consent: bool = row.try_get("consent")?;
    let details: String = row.try_get("details")?;
    let submitted_by: Option<String> = row.try_get("submitted_by")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;
    let synced_at: Option<String> = row.try_get("synced_at")?;

    Ok(RecordMetadata {
        id: RecordId::new(id).map_err(FieldSyncError::Store)?,
        health_id: HealthId::new(health_id).map_err(FieldSyncError::Store)?,
        server_id: server_id
            .map(ServerId::new)
            .transpose()
            .map_err(FieldSyncError::Store)?,
        status: RecordStatus::from_str(&status).map_err(FieldSyncError::Store)?,
        submission_mode: SubmissionMode::from_str(&submission_mode)
            .map_err(FieldSyncError::Store)?,
        retry_count: u32::try_from(retry_count)
            .map_err(|_| FieldSyncError::Store(format!("invalid retry_count {retry_count}")))?,
        last_error,
        consent,
        details: serde_json::from_str::<ChildDetails>(&details)?,
        submitted_by,
        timestamps: Timestamps {
            created_at: parse_ts("created_at", &created_at)?,
            updated_at: parse_ts("updated_at", &updated_at)?,
            synced_at: synced_at
                .as_deref()
                .map(|s| parse_ts("synced_at", s))
                .transpose()?,
        },
    })
}

fn limit_of(filter: &RecordFilter) -> i64 {
    // SQLite treats a negative LIMIT as unbounded
    filter.limit.map_or(-1, |l| l as i64)
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn put(&self, record: &Record) -> Result<Record> {
        let sensitive = self.cipher.seal(&record.sensitive)?;
        let details = serde_json::to_string(&record.meta.details)?;
        let mut stored = record.clone();

        let mut tx = self.pool.begin().await?;

        let existing =
            sqlx::query("SELECT health_id, status, created_at FROM records WHERE id = ?")
                .bind(record.meta.id.as_str())
                .fetch_optional(&mut *tx)
                .await?;

        // Status the row must still have when the upsert lands
        let mut current = record.meta.status;
        if let Some(row) = existing {
            let health_id: String = row.try_get("health_id")?;
            if health_id != record.meta.health_id.as_str() {
                return Err(FieldSyncError::Store(format!(
                    "health_id of record {} cannot change ({} -> {})",
                    record.meta.id, health_id, record.meta.health_id
                )));
            }

            let status: String = row.try_get("status")?;
            current = RecordStatus::from_str(&status).map_err(FieldSyncError::Store)?;
            let next = record.meta.status;
            if current.is_terminal() || (current != next && !current.can_transition_to(next)) {
                return Err(FieldSyncError::InvalidTransition {
                    from: current.to_string(),
                    to: next.to_string(),
                });
            }

            let created_at: String = row.try_get("created_at")?;
            stored.meta.timestamps.created_at = parse_ts("created_at", &created_at)?;
        }

        let m = &stored.meta;
        let result = sqlx::query(
            r#"
            INSERT INTO records (
                id, health_id, server_id, status, submission_mode, retry_count,
                last_error, consent, details, submitted_by, sensitive,
                created_at, updated_at, synced_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                server_id = excluded.server_id,
                status = excluded.status,
                submission_mode = excluded.submission_mode,
                retry_count = excluded.retry_count,
                last_error = excluded.last_error,
                consent = excluded.consent,
                details = excluded.details,
                submitted_by = excluded.submitted_by,
                sensitive = excluded.sensitive,
                updated_at = excluded.updated_at,
                synced_at = excluded.synced_at
            WHERE records.status = ?
            "#,
        )
        .bind(m.id.as_str())
        .bind(m.health_id.as_str())
        .bind(m.server_id.as_ref().map(|s| s.as_str()))
        .bind(m.status.as_str())
        .bind(m.submission_mode.as_str())
        .bind(i64::from(m.retry_count))
        .bind(m.last_error.as_deref())
        .bind(m.consent)
        .bind(&details)
        .bind(m.submitted_by.as_deref())
        .bind(&sensitive)
        .bind(ts(&m.timestamps.created_at))
        .bind(ts(&m.timestamps.updated_at))
        .bind(m.timestamps.synced_at.as_ref().map(ts))
        .bind(current.as_str())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(FieldSyncError::InvalidTransition {
                from: current.to_string(),
                to: m.status.to_string(),
            });
        }

        tx.commit().await?;

        tracing::debug!(
            record_id = %stored.meta.id,
            health_id = %stored.meta.health_id,
            status = %stored.meta.status,
            "Record stored"
        );
        Ok(stored)
    }

    async fn get(&self, id: &RecordId) -> Result<Option<Record>> {
        let row = sqlx::query(&format!(
            "SELECT {META_COLUMNS}, sensitive FROM records WHERE id = ?"
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| self.decrypt_row(&r)).transpose()
    }

    async fn get_all(&self, filter: &RecordFilter) -> Result<Vec<Record>> {
        let rows = sqlx::query(&format!(
            "SELECT {META_COLUMNS}, sensitive FROM records \
             WHERE (?1 IS NULL OR status = ?1) \
             ORDER BY created_at ASC, id ASC LIMIT ?2"
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(limit_of(filter))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(|r| self.decrypt_row(r)).collect()
    }

    async fn delete(&self, id: &RecordId) -> Result<()> {
        let result = sqlx::query("DELETE FROM records WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        tracing::debug!(record_id = %id, deleted = result.rows_affected(), "Record deleted");
        Ok(())
    }

    async fn count(&self, filter: &RecordFilter) -> Result<usize> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM records WHERE (?1 IS NULL OR status = ?1)")
                .bind(filter.status.map(|s| s.as_str()))
                .fetch_one(&self.pool)
                .await?;

        let count = count as usize;
        Ok(filter.limit.map_or(count, |l| count.min(l)))
    }

    async fn list_metadata(&self, filter: &RecordFilter) -> Result<Vec<RecordMetadata>> {
        let rows = sqlx::query(&format!(
            "SELECT {META_COLUMNS} FROM records \
             WHERE (?1 IS NULL OR status = ?1) \
             ORDER BY created_at ASC, id ASC LIMIT ?2"
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(limit_of(filter))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_metadata).collect()
    }

    async fn get_metadata(&self, id: &RecordId) -> Result<Option<RecordMetadata>> {
        let row = sqlx::query(&format!("SELECT {META_COLUMNS} FROM records WHERE id = ?"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_metadata).transpose()
    }

    async fn health_id_exists(&self, health_id: &HealthId) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM records WHERE health_id = ? LIMIT 1")
            .bind(health_id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    async fn apply_metadata(
        &self,
        id: &RecordId,
        expected: RecordStatus,
        patch: MetadataPatch,
    ) -> Result<MetadataUpdate> {
        if let Some(next) = patch.status {
            if next != expected && !expected.can_transition_to(next) {
                return Err(FieldSyncError::InvalidTransition {
                    from: expected.to_string(),
                    to: next.to_string(),
                });
            }
        }

        let now = ts(&Utc::now());
        let (clear_error, new_error) = match &patch.last_error {
            Some(value) => (true, value.clone()),
            None => (false, None),
        };

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE records SET
                status = COALESCE(?1, status),
                server_id = COALESCE(?2, server_id),
                retry_count = COALESCE(?3, retry_count),
                last_error = CASE WHEN ?4 THEN ?5 ELSE last_error END,
                submitted_by = COALESCE(?6, submitted_by),
                updated_at = ?7,
                synced_at = CASE WHEN ?1 = 'synced' THEN COALESCE(synced_at, ?7) ELSE synced_at END
            WHERE id = ?8 AND status = ?9
            "#,
        )
        .bind(patch.status.map(|s| s.as_str()))
        .bind(patch.server_id.as_ref().map(|s| s.as_str()))
        .bind(patch.retry_count.map(i64::from))
        .bind(clear_error)
        .bind(new_error)
        .bind(patch.submitted_by.as_deref())
        .bind(&now)
        .bind(id.as_str())
        .bind(expected.as_str())
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query(&format!("SELECT {META_COLUMNS} FROM records WHERE id = ?"))
            .bind(id.as_str())
            .fetch_optional(&mut *tx)
            .await?;

        tx.commit().await?;

        let meta = match row {
            Some(r) => row_to_metadata(&r)?,
            None => return Err(FieldSyncError::NotFound(id.to_string())),
        };

        if result.rows_affected() == 0 {
            tracing::debug!(
                record_id = %id,
                expected = %expected,
                actual = %meta.status,
                "Conditional update skipped"
            );
            return Ok(MetadataUpdate::StatusMismatch(meta));
        }

        Ok(MetadataUpdate::Applied(meta))
    }

    async fn load_settings(&self) -> Result<Option<serde_json::Value>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(SETTINGS_KEY)
            .fetch_optional(&self.pool)
            .await?;

        value
            .map(|envelope| self.cipher.open(&envelope, "settings"))
            .transpose()
    }

    async fn save_settings(&self, settings: &serde_json::Value) -> Result<()> {
        let envelope = self.cipher.seal(settings)?;
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(SETTINGS_KEY)
        .bind(&envelope)
        .bind(ts(&Utc::now()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn hold_form(&self, form: &serde_json::Value) -> Result<DateTime<Utc>> {
        let envelope = self.cipher.seal(form)?;
        let held_at = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO form_drafts (slot, form, held_at) VALUES (0, ?, ?)
            ON CONFLICT(slot) DO UPDATE SET form = excluded.form, held_at = excluded.held_at
            "#,
        )
        .bind(&envelope)
        .bind(ts(&held_at))
        .execute(&self.pool)
        .await?;

        tracing::debug!(held_at = %held_at, "Form held pending authentication");
        Ok(held_at)
    }

    async fn peek_held_form(&self) -> Result<Option<HeldForm>> {
        let row = sqlx::query("SELECT form, held_at FROM form_drafts WHERE slot = 0")
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let envelope: String = row.try_get("form")?;
        let held_at: String = row.try_get("held_at")?;

        Ok(Some(HeldForm {
            form: self.cipher.open(&envelope, "held form")?,
            held_at: parse_ts("held_at", &held_at)?,
        }))
    }

    async fn clear_held_form(&self) -> Result<()> {
        sqlx::query("DELETE FROM form_drafts WHERE slot = 0")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::secret_string;

    async fn memory_store() -> SqliteRecordStore {
        let cipher = FieldCipher::from_secret(&secret_string("unit-test-key".to_string())).unwrap();
        SqliteRecordStore::open_with_cipher(MEMORY_PATH, cipher)
            .await
            .unwrap()
    }

    fn record(status: RecordStatus) -> Record {
        let now = Utc::now();
        Record {
            meta: RecordMetadata {
                id: RecordId::generate(),
                health_id: HealthId::new("CHR20240315AZ9Q1").unwrap(),
                server_id: None,
                status,
                submission_mode: SubmissionMode::Offline,
                retry_count: 0,
                last_error: None,
                consent: true,
                details: ChildDetails {
                    age: Some(3),
                    ..ChildDetails::default()
                },
                submitted_by: None,
                timestamps: Timestamps::created(now),
            },
            sensitive: SensitiveFields {
                child_name: "Asha".to_string(),
                guardian_name: "Meera".to_string(),
                photo: None,
                observations: serde_json::json!({}),
            },
        }
    }

    #[tokio::test]
    async fn test_schema_version_set() {
        let store = memory_store().await;
        let version: i64 = sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_sensitive_column_is_ciphertext() {
        let store = memory_store().await;
        let r = record(RecordStatus::Pending);
        store.put(&r).await.unwrap();

        let raw: String = sqlx::query_scalar("SELECT sensitive FROM records WHERE id = ?")
            .bind(r.meta.id.as_str())
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert!(raw.starts_with("v1:"));
        assert!(!raw.contains("Asha"));
    }

    #[tokio::test]
    async fn test_put_keeps_created_at_and_health_id() {
        let store = memory_store().await;
        let r = record(RecordStatus::Draft);
        let first = store.put(&r).await.unwrap();

        let mut changed = r.clone();
        changed.meta.timestamps.created_at = Utc::now() + chrono::Duration::days(1);
        let second = store.put(&changed).await.unwrap();
        assert_eq!(
            second.meta.timestamps.created_at,
            first.meta.timestamps.created_at
        );

        changed.meta.health_id = HealthId::new("CHR20240316BZZZZ").unwrap();
        assert!(store.put(&changed).await.is_err());
    }

    #[tokio::test]
    async fn test_put_never_overwrites_synced_row() {
        let store = memory_store().await;
        let r = record(RecordStatus::Pending);
        store.put(&r).await.unwrap();

        // Another context syncs the record after this copy was loaded
        store
            .apply_metadata(
                &r.meta.id,
                RecordStatus::Pending,
                MetadataPatch::synced(Some(ServerId::new("srv-1").unwrap())),
            )
            .await
            .unwrap();

        let result = store.put(&r).await;
        assert!(matches!(
            result,
            Err(FieldSyncError::InvalidTransition { ref from, .. }) if from == "synced"
        ));

        let meta = store.get_metadata(&r.meta.id).await.unwrap().unwrap();
        assert_eq!(meta.status, RecordStatus::Synced);
        assert_eq!(meta.server_id.unwrap().as_str(), "srv-1");
        assert!(meta.timestamps.synced_at.is_some());
    }

    #[tokio::test]
    async fn test_put_rejects_stale_draft_over_pending() {
        let store = memory_store().await;
        let mut r = record(RecordStatus::Draft);
        store.put(&r).await.unwrap();

        r.meta.status = RecordStatus::Pending;
        store.put(&r).await.unwrap();

        r.meta.status = RecordStatus::Draft;
        assert!(matches!(
            store.put(&r).await,
            Err(FieldSyncError::InvalidTransition { .. })
        ));
        let meta = store.get_metadata(&r.meta.id).await.unwrap().unwrap();
        assert_eq!(meta.status, RecordStatus::Pending);
    }

    #[tokio::test]
    async fn test_apply_metadata_conditional() {
        let store = memory_store().await;
        let r = record(RecordStatus::Pending);
        store.put(&r).await.unwrap();

        let update = store
            .apply_metadata(
                &r.meta.id,
                RecordStatus::Pending,
                MetadataPatch::synced(Some(ServerId::new("srv-1").unwrap())),
            )
            .await
            .unwrap();
        let MetadataUpdate::Applied(meta) = update else {
            panic!("expected applied update");
        };
        assert_eq!(meta.status, RecordStatus::Synced);
        assert!(meta.timestamps.synced_at.is_some());

        // Second attempt sees the record already synced
        let update = store
            .apply_metadata(
                &r.meta.id,
                RecordStatus::Pending,
                MetadataPatch::failed_attempt(RecordStatus::Pending, 1, "timeout"),
            )
            .await
            .unwrap();
        assert!(matches!(update, MetadataUpdate::StatusMismatch(ref m) if m.status == RecordStatus::Synced));
    }

    #[tokio::test]
    async fn test_apply_metadata_rejects_invalid_transition() {
        let store = memory_store().await;
        let r = record(RecordStatus::Draft);
        store.put(&r).await.unwrap();

        let result = store
            .apply_metadata(&r.meta.id, RecordStatus::Draft, MetadataPatch::synced(None))
            .await;
        assert!(matches!(result, Err(FieldSyncError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_apply_metadata_unknown_record() {
        let store = memory_store().await;
        let result = store
            .apply_metadata(&RecordId::generate(), RecordStatus::Pending, MetadataPatch::synced(None))
            .await;
        assert!(matches!(result, Err(FieldSyncError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_held_form_single_slot() {
        let store = memory_store().await;
        assert!(store.peek_held_form().await.unwrap().is_none());

        store.hold_form(&serde_json::json!({"n": 1})).await.unwrap();
        store.hold_form(&serde_json::json!({"n": 2})).await.unwrap();

        let held = store.peek_held_form().await.unwrap().unwrap();
        assert_eq!(held.form, serde_json::json!({"n": 2}));

        store.clear_held_form().await.unwrap();
        assert!(store.peek_held_form().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_settings_round_trip() {
        let store = memory_store().await;
        assert!(store.load_settings().await.unwrap().is_none());

        let settings = serde_json::json!({"session": {"user_id": "emp-1"}});
        store.save_settings(&settings).await.unwrap();
        assert_eq!(store.load_settings().await.unwrap(), Some(settings));
    }
}
