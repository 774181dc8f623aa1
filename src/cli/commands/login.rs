//! Login and logout command implementations
//!
//! Signing in stores the session in the encrypted settings and resumes a
//! submission the auth gate was holding.

use crate::core::auth::{LoginMethod, Session};
use crate::domain::Result;
use clap::Args;

/// Arguments for the login command
#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Identifier kind: employeeId, email or uin
    #[arg(long)]
    pub kind: String,

    /// Identifier value
    #[arg(long)]
    pub value: String,

    /// Bearer token issued by the remote collaborator
    #[arg(long, env = "FIELDSYNC_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Local session lifetime in hours; omit for no local expiry
    #[arg(long)]
    pub ttl_hours: Option<i64>,
}

impl LoginArgs {
    fn session(&self) -> Result<Session> {
        let login = LoginMethod::parse(&self.kind, &self.value)?;
        Session::new(
            login,
            self.token.clone(),
            self.ttl_hours.map(chrono::Duration::hours),
        )
    }

    /// Execute the login command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(kind = %self.kind, "Signing in");

        let context = match super::open_context(config_path).await {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        let session = match self.session() {
            Ok(s) => s,
            Err(e) => {
                println!("❌ Sign-in rejected");
                println!("   Error: {e}");
                if let Ok(Some(held)) = context.gate().abandon().await {
                    println!(
                        "   The submission held at {} is kept; sign in again to resume it",
                        held.held_at.format("%H:%M:%S UTC")
                    );
                }
                context.shutdown().await;
                return Ok(super::EXIT_INVALID_INPUT);
            }
        };

        let user = session.login.to_string();
        let code = match context.resume_after_login(session).await {
            Ok(None) => {
                println!("🔑 Signed in as {user}");
                super::EXIT_OK
            }
            Ok(Some(submission)) => {
                println!("🔑 Signed in as {user}");
                println!();
                println!("↪️  Resumed held submission");
                super::submit::print_submission(&submission);
                super::EXIT_OK
            }
            Err(e) => {
                println!("🔑 Signed in as {user}, but the held submission could not be resumed");
                super::submit::report_submit_error(&e)
            }
        };

        context.shutdown().await;
        Ok(code)
    }
}

/// Arguments for the logout command
#[derive(Args, Debug)]
pub struct LogoutArgs {
    /// Also discard a submission held for sign-in
    #[arg(long)]
    pub discard_held: bool,
}

impl LogoutArgs {
    /// Execute the logout command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Signing out");

        let context = match super::open_context(config_path).await {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        let cleared = context.sessions().clear().await;
        let released = if self.discard_held {
            context.gate().release().await
        } else {
            Ok(())
        };

        let code = match (cleared, released) {
            (Ok(had_session), Ok(())) => {
                if had_session {
                    println!("👋 Signed out");
                } else {
                    println!("ℹ️  No active session");
                }
                if self.discard_held {
                    println!("🗑️  Held submission discarded");
                }
                super::EXIT_OK
            }
            (Err(e), _) | (_, Err(e)) => {
                println!("❌ Failed to update the local store");
                println!("   Error: {e}");
                super::EXIT_FATAL
            }
        };

        context.shutdown().await;
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(kind: &str, value: &str, token: &str) -> LoginArgs {
        LoginArgs {
            kind: kind.to_string(),
            value: value.to_string(),
            token: token.to_string(),
            ttl_hours: Some(8),
        }
    }

    #[test]
    fn test_session_from_email_login() {
        let session = args("email", " Nurse@Clinic.Example.org ", "tok").session().unwrap();
        assert_eq!(session.user_id, "nurse@clinic.example.org");
        assert!(session.expires_at.is_some());
        assert!(session.is_valid());
    }

    #[test]
    fn test_session_rejects_unknown_kind() {
        assert!(args("passport", "X123", "tok").session().is_err());
    }

    #[test]
    fn test_session_rejects_blank_token() {
        assert!(args("employeeId", "emp-042", "  ").session().is_err());
    }
}
