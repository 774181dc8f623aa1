//! Gate between `draft` and `pending`
//!
//! Every problem is collected before returning so the form can highlight all
//! of them at once.

use super::form::RecordForm;
use crate::domain::ValidationError;

/// Oldest age, in years, accepted for a child record
pub const MAX_AGE_YEARS: u32 = 18;

/// Checks required identity and guardian fields, plausible measurements and
/// explicit consent
///
/// # Examples
///
/// ```
/// use fieldsync::core::lifecycle::{validate_form, RecordForm};
///
/// let err = validate_form(&RecordForm::default()).unwrap_err();
/// assert_eq!(err.missing, vec!["child_name", "guardian_name", "age", "consent"]);
/// ```
pub fn validate_form(form: &RecordForm) -> Result<(), ValidationError> {
    let mut missing = Vec::new();

    if form.child_name.trim().is_empty() {
        missing.push("child_name");
    }
    if form.guardian_name.trim().is_empty() {
        missing.push("guardian_name");
    }
    match form.age {
        None => missing.push("age"),
        Some(age) if age > MAX_AGE_YEARS => missing.push("age"),
        Some(_) => {}
    }
    if form.weight_kg.map_or(false, |w| !(w > 0.0)) {
        missing.push("weight_kg");
    }
    if form.height_cm.map_or(false, |h| !(h > 0.0)) {
        missing.push("height_cm");
    }
    if !form.consent {
        missing.push("consent");
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new(
            missing.into_iter().map(str::to_string).collect(),
        ))
    }
}
