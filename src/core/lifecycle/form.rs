//! Form state submitted by a field worker

use crate::domain::{ChildDetails, Record, RecordId, SensitiveFields};
use serde::{Deserialize, Serialize};

/// Everything a field worker enters for one record
///
/// This is also what the auth gate parks in the holding area, so it must
/// round-trip through JSON unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordForm {
    /// Set when the form edits an existing draft or failed record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<RecordId>,

    #[serde(default)]
    pub child_name: String,

    #[serde(default)]
    pub guardian_name: String,

    #[serde(default)]
    pub age: Option<u32>,

    #[serde(default)]
    pub gender: Option<String>,

    #[serde(default)]
    pub weight_kg: Option<f64>,

    #[serde(default)]
    pub height_cm: Option<f64>,

    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub photo: Option<String>,

    #[serde(default)]
    pub observations: serde_json::Value,

    #[serde(default)]
    pub consent: bool,
}

impl RecordForm {
    /// Rebuilds the form for an existing record, for edit-then-resubmit
    pub fn from_record(record: &Record) -> Self {
        let details = &record.meta.details;
        Self {
            record_id: Some(record.meta.id.clone()),
            child_name: record.sensitive.child_name.clone(),
            guardian_name: record.sensitive.guardian_name.clone(),
            age: details.age,
            gender: details.gender.clone(),
            weight_kg: details.weight_kg,
            height_cm: details.height_cm,
            location: details.location.clone(),
            photo: record.sensitive.photo.clone(),
            observations: record.sensitive.observations.clone(),
            consent: record.meta.consent,
        }
    }

    /// Splits the form into clear-text details and the encrypted payload
    pub(crate) fn split(&self) -> (ChildDetails, SensitiveFields) {
        let details = ChildDetails {
            age: self.age,
            gender: clean(&self.gender),
            weight_kg: self.weight_kg,
            height_cm: self.height_cm,
            location: clean(&self.location),
        };
        let sensitive = SensitiveFields {
            child_name: self.child_name.trim().to_string(),
            guardian_name: self.guardian_name.trim().to_string(),
            photo: self.photo.clone().filter(|p| !p.is_empty()),
            observations: self.observations.clone(),
        };
        (details, sensitive)
    }
}

fn clean(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_form_parses_camel_case() {
        let form: RecordForm = serde_json::from_value(json!({
            "childName": "Asha",
            "guardianName": "Meera",
            "age": 3,
            "weightKg": 12.5,
            "consent": true,
            "observations": {"notes": "mild fever"}
        }))
        .unwrap();

        assert_eq!(form.child_name, "Asha");
        assert_eq!(form.weight_kg, Some(12.5));
        assert!(form.consent);
        assert!(form.record_id.is_none());
    }

    #[test]
    fn test_split_trims_and_drops_blanks() {
        let form = RecordForm {
            child_name: "  Asha ".to_string(),
            guardian_name: "Meera".to_string(),
            location: Some("   ".to_string()),
            gender: Some(" female ".to_string()),
            photo: Some(String::new()),
            ..RecordForm::default()
        };
        let (details, sensitive) = form.split();
        assert_eq!(sensitive.child_name, "Asha");
        assert_eq!(sensitive.photo, None);
        assert_eq!(details.location, None);
        assert_eq!(details.gender.as_deref(), Some("female"));
    }
}
