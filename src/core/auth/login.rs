//! Login identifiers
//!
//! A field worker signs in with one of three identifier kinds. Each kind has
//! exactly one resolver that normalises and validates the raw value, so call
//! sites never branch on the kind themselves.

use crate::domain::{FieldSyncError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a field worker identifies themselves
///
/// Serialized as `{"kind": "employeeId" | "email" | "uin", "value": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum LoginMethod {
    EmployeeId(String),
    Email(String),
    Uin(String),
}

impl LoginMethod {
    /// Builds a login method from a CLI-style kind name and raw value
    ///
    /// # Examples
    ///
    /// ```
    /// use fieldsync::core::auth::LoginMethod;
    ///
    /// let login = LoginMethod::parse("email", " Asha.Worker@Example.org ").unwrap();
    /// assert_eq!(login.value(), "asha.worker@example.org");
    /// ```
    pub fn parse(kind: &str, value: &str) -> Result<Self> {
        let raw = match kind.trim().to_ascii_lowercase().as_str() {
            "employeeid" | "employee_id" | "employee-id" => LoginMethod::EmployeeId(value.to_string()),
            "email" => LoginMethod::Email(value.to_string()),
            "uin" => LoginMethod::Uin(value.to_string()),
            other => {
                return Err(FieldSyncError::InvalidLogin(format!(
                    "unknown login kind '{other}' (expected employeeId, email or uin)"
                )))
            }
        };
        raw.resolve()
    }

    /// Normalises and validates the value with the resolver for its kind
    pub fn resolve(self) -> Result<Self> {
        match self {
            LoginMethod::EmployeeId(v) => resolve_employee_id(&v).map(LoginMethod::EmployeeId),
            LoginMethod::Email(v) => resolve_email(&v).map(LoginMethod::Email),
            LoginMethod::Uin(v) => resolve_uin(&v).map(LoginMethod::Uin),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LoginMethod::EmployeeId(_) => "employeeId",
            LoginMethod::Email(_) => "email",
            LoginMethod::Uin(_) => "uin",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            LoginMethod::EmployeeId(v) | LoginMethod::Email(v) | LoginMethod::Uin(v) => v,
        }
    }

    /// Value safe to write to logs
    ///
    /// UINs are national identifiers and only their last four digits are shown.
    pub fn masked(&self) -> String {
        match self {
            LoginMethod::Uin(v) => {
                let tail: String = v.chars().skip(v.len().saturating_sub(4)).collect();
                format!("{}{tail}", "*".repeat(v.len().saturating_sub(4)))
            }
            other => other.value().to_string(),
        }
    }
}

impl fmt::Display for LoginMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.masked())
    }
}

fn resolve_employee_id(raw: &str) -> Result<String> {
    let value = raw.trim().to_ascii_uppercase();
    let valid_chars = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !(3..=32).contains(&value.len()) || !valid_chars {
        return Err(FieldSyncError::InvalidLogin(format!(
            "employee ID '{}' must be 3-32 letters, digits, '-' or '_'",
            raw.trim()
        )));
    }
    Ok(value)
}

fn resolve_email(raw: &str) -> Result<String> {
    let value = raw.trim().to_lowercase();
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(FieldSyncError::InvalidLogin(format!(
            "'{}' is not a valid email address",
            raw.trim()
        )));
    }
    Ok(value)
}

fn resolve_uin(raw: &str) -> Result<String> {
    let value: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    if !(10..=16).contains(&value.len()) || !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(FieldSyncError::InvalidLogin(
            "UIN must be 10-16 digits".to_string(),
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_tagged_serde_shape() {
        let login = LoginMethod::EmployeeId("EMP-7".to_string());
        let json = serde_json::to_value(&login).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "employeeId", "value": "EMP-7"}));

        let back: LoginMethod =
            serde_json::from_value(serde_json::json!({"kind": "uin", "value": "1234567890"})).unwrap();
        assert_eq!(back, LoginMethod::Uin("1234567890".to_string()));
    }

    #[test_case("employeeId", " emp-007 ", "EMP-007" ; "employee id uppercased")]
    #[test_case("email", "Asha@Example.ORG", "asha@example.org" ; "email lowercased")]
    #[test_case("uin", "1234 5678 9012", "123456789012" ; "uin spaces stripped")]
    #[test_case("uin", "1234-5678-90", "1234567890" ; "uin hyphens stripped")]
    fn test_resolvers_normalise(kind: &str, raw: &str, expected: &str) {
        assert_eq!(LoginMethod::parse(kind, raw).unwrap().value(), expected);
    }

    #[test_case("employeeId", "ab" ; "employee id too short")]
    #[test_case("employeeId", "emp 7" ; "employee id with space")]
    #[test_case("email", "asha.example.org" ; "email without at")]
    #[test_case("email", "asha@localhost" ; "email without dot in domain")]
    #[test_case("email", "@example.org" ; "email without local part")]
    #[test_case("uin", "12345" ; "uin too short")]
    #[test_case("uin", "12345abcde" ; "uin with letters")]
    #[test_case("badge", "123" ; "unknown kind")]
    fn test_resolvers_reject(kind: &str, raw: &str) {
        assert!(matches!(
            LoginMethod::parse(kind, raw),
            Err(FieldSyncError::InvalidLogin(_))
        ));
    }

    #[test]
    fn test_uin_is_masked_in_display() {
        let login = LoginMethod::parse("uin", "123456789012").unwrap();
        assert_eq!(login.to_string(), "uin:********9012");
        assert_eq!(
            LoginMethod::parse("email", "a@b.org").unwrap().to_string(),
            "email:a@b.org"
        );
    }
}
