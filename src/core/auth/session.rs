//! Authenticated sessions
//!
//! The session lives inside the encrypted settings blob so the background
//! worker can pick it up from the store without sharing memory with the
//! foreground context.

use super::login::LoginMethod;
use crate::adapters::store::RecordStore;
use crate::config::{secret_string, SecretString};
use crate::domain::{FieldSyncError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Settings key holding the session
const SESSION_KEY: &str = "session";

/// An authenticated field worker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Submitter identity attached to uploaded records
    pub user_id: String,

    pub login: LoginMethod,

    /// Bearer token for the remote collaborator
    pub token: SecretString,

    pub issued_at: DateTime<Utc>,

    /// `None` means the token does not expire locally
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Creates a session for a resolved login
    pub fn new(login: LoginMethod, token: String, ttl: Option<Duration>) -> Result<Self> {
        let login = login.resolve()?;
        if token.trim().is_empty() {
            return Err(FieldSyncError::InvalidLogin(
                "session token cannot be empty".to_string(),
            ));
        }

        let issued_at = Utc::now();
        Ok(Self {
            user_id: login.value().to_string(),
            login,
            token: secret_string(token),
            issued_at,
            expires_at: ttl.map(|ttl| issued_at + ttl),
        })
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(false, |exp| now >= exp)
    }

    pub fn is_valid(&self) -> bool {
        !self.is_expired_at(Utc::now())
    }
}

/// Reads and writes the session in the store's settings blob
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn RecordStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Returns the stored session if one exists and has not expired
    pub async fn current(&self) -> Result<Option<Session>> {
        let Some(settings) = self.store.load_settings().await? else {
            return Ok(None);
        };
        let Some(raw) = settings.get(SESSION_KEY).filter(|v| !v.is_null()) else {
            return Ok(None);
        };

        let session: Session = serde_json::from_value(raw.clone())?;
        if !session.is_valid() {
            tracing::info!(user = %session.login, "Stored session has expired");
            return Ok(None);
        }
        Ok(Some(session))
    }

    pub async fn save(&self, session: &Session) -> Result<()> {
        let mut settings = self.settings_object().await?;
        settings.insert(SESSION_KEY.to_string(), serde_json::to_value(session)?);
        self.store
            .save_settings(&serde_json::Value::Object(settings))
            .await?;

        tracing::info!(user = %session.login, "Session stored");
        Ok(())
    }

    /// Removes the session; other settings are kept
    pub async fn clear(&self) -> Result<bool> {
        let mut settings = self.settings_object().await?;
        let removed = settings.remove(SESSION_KEY).is_some();
        if removed {
            self.store
                .save_settings(&serde_json::Value::Object(settings))
                .await?;
            tracing::info!("Session cleared");
        }
        Ok(removed)
    }

    async fn settings_object(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        match self.store.load_settings().await? {
            Some(serde_json::Value::Object(map)) => Ok(map),
            Some(_) | None => Ok(serde_json::Map::new()),
        }
    }
}
