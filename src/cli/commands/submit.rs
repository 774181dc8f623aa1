//! Submit command implementation
//!
//! Reads a form from a JSON file and stores it as a pending record, or as a
//! draft with `--draft`.

use crate::core::context::{EngineContext, Submission};
use crate::core::lifecycle::RecordForm;
use crate::domain::{FieldSyncError, Record, SubmissionMode};
use clap::Args;
use std::path::Path;

/// Arguments for the submit command
#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Path to the form as JSON (camelCase field names)
    pub form: String,

    /// Save as a draft without validating or syncing
    #[arg(long)]
    pub draft: bool,
}

/// Reads a form file, printing the problem on failure
pub(crate) fn read_form(path: &Path) -> Result<RecordForm, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    serde_json::from_str(&content).map_err(|e| format!("invalid form JSON: {e}"))
}

impl SubmitArgs {
    /// Execute the submit command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(form = %self.form, draft = self.draft, "Submitting record");

        let form = match read_form(Path::new(&self.form)) {
            Ok(form) => form,
            Err(e) => {
                println!("❌ {e}");
                return Ok(super::EXIT_INVALID_INPUT);
            }
        };

        let context = match super::open_context(config_path).await {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        let code = if self.draft {
            save_draft(&context, &form).await
        } else {
            match context.submit(form).await {
                Ok(submission) => {
                    print_submission(&submission);
                    super::EXIT_OK
                }
                Err(e) => report_submit_error(&e),
            }
        };

        context.shutdown().await;
        Ok(code)
    }
}

async fn save_draft(context: &EngineContext, form: &RecordForm) -> i32 {
    let mode = if context.monitor().is_online() {
        SubmissionMode::Online
    } else {
        SubmissionMode::Offline
    };
    let saved = match &form.record_id {
        Some(id) => context.lifecycle().update_draft(id, form).await,
        None => context.lifecycle().create_draft(form, mode).await,
    };

    match saved {
        Ok(record) => {
            println!("📝 Draft saved");
            print_record(&record);
            super::EXIT_OK
        }
        Err(e) => report_submit_error(&e),
    }
}

/// Maps a submit failure to an exit code, printing what happened
pub(crate) fn report_submit_error(error: &FieldSyncError) -> i32 {
    match error {
        FieldSyncError::Validation(e) => {
            println!("❌ The form is incomplete");
            for field in &e.missing {
                println!("   - {field}");
            }
            super::EXIT_INVALID_INPUT
        }
        FieldSyncError::AuthRequired(e) => {
            println!("🔒 Sign-in required; the form was held at {}", e.held_at.format("%H:%M:%S UTC"));
            println!("   Run: fieldsync login --kind <employeeId|email|uin> --value <id> --token <token>");
            super::EXIT_OK
        }
        FieldSyncError::InvalidTransition { from, to } => {
            println!("❌ Cannot move the record from {from} to {to}");
            super::EXIT_INVALID_INPUT
        }
        FieldSyncError::NotFound(id) => {
            println!("❌ Record not found: {id}");
            super::EXIT_INVALID_INPUT
        }
        other => {
            tracing::error!(error = %other, "Submission failed");
            println!("❌ Submission failed");
            println!("   Error: {other}");
            super::EXIT_FATAL
        }
    }
}

pub(crate) fn print_submission(submission: &Submission) {
    println!("✅ Record stored");
    print_record(&submission.record);
    if let Some(outcome) = &submission.sync {
        println!();
        super::print_sync_outcome(outcome);
    }
}

fn print_record(record: &Record) {
    println!("  Health ID: {}", record.meta.health_id);
    println!("  Record ID: {}", record.meta.id);
    println!("  Status: {}", record.meta.status);
    println!("  Mode: {}", record.meta.submission_mode);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AuthRequiredError, ValidationError};
    use std::io::Write;

    #[test]
    fn test_read_form_camel_case() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"childName": "Asha", "guardianName": "Meera", "age": 3, "weightKg": 12.5, "consent": true}}"#
        )
        .unwrap();

        let form = read_form(file.path()).unwrap();
        assert_eq!(form.child_name, "Asha");
        assert_eq!(form.weight_kg, Some(12.5));
        assert!(form.consent);
        assert!(form.record_id.is_none());
    }

    #[test]
    fn test_read_form_rejects_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(read_form(file.path()).unwrap_err().contains("invalid form JSON"));
    }

    #[test]
    fn test_error_exit_codes() {
        let validation = FieldSyncError::Validation(ValidationError::new(vec!["consent".to_string()]));
        assert_eq!(report_submit_error(&validation), super::super::EXIT_INVALID_INPUT);

        let held = FieldSyncError::AuthRequired(AuthRequiredError {
            held_at: chrono::Utc::now(),
        });
        assert_eq!(report_submit_error(&held), super::super::EXIT_OK);

        let store = FieldSyncError::Store("disk full".to_string());
        assert_eq!(report_submit_error(&store), super::super::EXIT_FATAL);
    }
}
