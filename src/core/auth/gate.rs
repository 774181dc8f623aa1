//! Submission-time authentication gate
//!
//! Offline submissions never need a session. An online submission without
//! one is parked in the form holding area and resumed once the worker signs
//! in. A held form is only discarded after the resumed submission has been
//! stored.

use super::session::{Session, SessionStore};
use crate::adapters::store::{HeldForm, RecordStore};
use crate::core::lifecycle::RecordForm;
use crate::domain::{AuthRequiredError, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// What a submission may do right now
#[derive(Debug, Clone)]
pub enum GateDecision {
    /// No verified connectivity; store locally as an offline submission
    ProceedOffline,

    /// Connected with a valid session
    ProceedOnline(Session),
}

/// A held form with its parse result
#[derive(Debug, Clone)]
pub struct HeldSubmission {
    pub form: RecordForm,
    pub held_at: DateTime<Utc>,
}

/// Decides whether a submission needs authentication first
#[derive(Clone)]
pub struct AuthGate {
    store: Arc<dyn RecordStore>,
    sessions: SessionStore,
}

impl AuthGate {
    pub fn new(store: Arc<dyn RecordStore>, sessions: SessionStore) -> Self {
        Self { store, sessions }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Evaluates a submission against verified connectivity
    ///
    /// Online without a session, the form is held and
    /// [`FieldSyncError::AuthRequired`](crate::domain::FieldSyncError::AuthRequired)
    /// is returned. That is a deferral, not a failure.
    pub async fn evaluate(&self, form: &RecordForm, online: bool) -> Result<GateDecision> {
        if !online {
            return Ok(GateDecision::ProceedOffline);
        }

        if let Some(session) = self.sessions.current().await? {
            return Ok(GateDecision::ProceedOnline(session));
        }

        let held_at = self.store.hold_form(&serde_json::to_value(form)?).await?;
        tracing::info!(held_at = %held_at, "Online submission held until sign-in");
        Err(AuthRequiredError { held_at }.into())
    }

    /// Stores the new session and hands back the held form, if any
    ///
    /// The form stays in the holding area; call [`AuthGate::release`] once the
    /// resumed submission has been saved.
    pub async fn complete_authentication(&self, session: &Session) -> Result<Option<HeldSubmission>> {
        self.sessions.save(session).await?;
        let held = self.held().await?;
        if let Some(h) = &held {
            tracing::info!(
                user = %session.login,
                held_at = %h.held_at,
                "Resuming held submission after sign-in"
            );
        }
        Ok(held)
    }

    /// Sign-in failed or was cancelled; the held form is kept
    pub async fn abandon(&self) -> Result<Option<HeldSubmission>> {
        let held = self.held().await?;
        if let Some(h) = &held {
            tracing::warn!(
                held_at = %h.held_at,
                "Sign-in abandoned; held submission kept for manual resubmission"
            );
        }
        Ok(held)
    }

    /// The currently held form, if any
    pub async fn held(&self) -> Result<Option<HeldSubmission>> {
        match self.store.peek_held_form().await? {
            Some(HeldForm { form, held_at }) => Ok(Some(HeldSubmission {
                form: serde_json::from_value(form)?,
                held_at,
            })),
            None => Ok(None),
        }
    }

    /// Discards the held form after it has been stored as a record
    pub async fn release(&self) -> Result<()> {
        self.store.clear_held_form().await
    }
}
