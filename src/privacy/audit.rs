//! Advisory scan for identifying data that survived anonymization.
//!
//! Only the fixed PII column set is ever removed. Clinics send whatever columns
//! they like, so this module looks at what is left and reports columns whose
//! names or values look identifying. It never changes the batch.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::batch::RecordBatch;
use crate::types::{Value, PATIENT_HASH_COLUMN};

/// Text values inspected per column
const VALUE_SAMPLE_SIZE: usize = 100;

/// Column name patterns that suggest residual identifying data
const IDENTIFYING_NAME_PATTERNS: &[&str] = &[
    "first_name",
    "last_name",
    "fname",
    "lname",
    "surname",
    "full_name",
    "initials",
    "mrn",
    "medical_record",
    "ssn",
    "social_security",
    "nhs",
    "cnic",
    "passport",
    "dob",
    "birth",
    "date_of_birth",
    "street",
    "city",
    "zip",
    "postal",
    "postcode",
    "mobile",
    "cell",
    "telephone",
    "fax",
    "contact",
    "next_of_kin",
    "guardian",
    "insurance",
    "ip_address",
    "photo",
];

/// Why a column was flagged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditReason {
    ColumnName,
    ColumnValue,
}

/// A residual-PII finding for one column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditWarning {
    pub column: String,
    pub reason: AuditReason,
    pub pattern: &'static str,
    pub message: String,
}

impl AuditWarning {
    fn name(column: &str, pattern: &'static str) -> Self {
        Self {
            column: column.to_string(),
            reason: AuditReason::ColumnName,
            pattern,
            message: format!(
                "Column '{}' matches identifying pattern '{}'; values were kept",
                column, pattern
            ),
        }
    }

    fn value(column: &str, pattern: &'static str, description: &str) -> Self {
        Self {
            column: column.to_string(),
            reason: AuditReason::ColumnValue,
            pattern,
            message: format!("Column '{}': {}", column, description),
        }
    }
}

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap()
});

static PHONE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\+?\d{0,3}[-.\s]?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}$").unwrap()
});

static SSN_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{3}-\d{2}-\d{4}$").unwrap());

static POSTAL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{5}-\d{4}|[A-Za-z]\d[A-Za-z]\s?\d[A-Za-z]\d)$").unwrap()
});

/// Scan the columns of an anonymized batch for residual identifying data
pub fn audit(batch: &RecordBatch) -> Vec<AuditWarning> {
    let mut warnings = Vec::new();

    for column in batch.columns() {
        if column == PATIENT_HASH_COLUMN {
            continue;
        }

        if let Some(pattern) = check_column_name(column) {
            warnings.push(AuditWarning::name(column, pattern));
            continue;
        }

        let found = batch
            .column_values(column)
            .filter_map(|v| match v {
                Value::Text(s) => Some(s.as_str()),
                _ => None,
            })
            .take(VALUE_SAMPLE_SIZE)
            .find_map(check_value_pattern);

        if let Some((pattern, description)) = found {
            warnings.push(AuditWarning::value(column, pattern, description));
        }
    }

    for warning in &warnings {
        tracing::warn!(column = %warning.column, pattern = warning.pattern, "{}", warning.message);
    }

    warnings
}

/// Match a column name against the identifying name patterns
pub fn check_column_name(name: &str) -> Option<&'static str> {
    let normalized = name.to_lowercase().replace(['-', ' ', '.'], "_");
    IDENTIFYING_NAME_PATTERNS
        .iter()
        .copied()
        .find(|pattern| matches_pattern(&normalized, pattern))
}

/// Match a cell value against the identifying value patterns
pub fn check_value_pattern(value: &str) -> Option<(&'static str, &'static str)> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if EMAIL_PATTERN.is_match(trimmed) {
        Some(("email", "values look like email addresses"))
    } else if SSN_PATTERN.is_match(trimmed) {
        Some(("ssn", "values look like social security numbers"))
    } else if PHONE_PATTERN.is_match(trimmed) {
        Some(("phone", "values look like phone numbers"))
    } else if POSTAL_PATTERN.is_match(trimmed) {
        Some(("postal", "values look like postal codes"))
    } else {
        None
    }
}

/// Whole-name or underscore-delimited word match
fn matches_pattern(normalized_name: &str, pattern: &str) -> bool {
    if normalized_name == pattern {
        return true;
    }

    if !pattern.contains('_') {
        return normalized_name.split('_').any(|part| part == pattern);
    }

    normalized_name.starts_with(&format!("{}_", pattern))
        || normalized_name.ends_with(&format!("_{}", pattern))
        || normalized_name.contains(&format!("_{}_", pattern))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::Row;

    fn batch(columns: &[&str], rows: &[&[&str]]) -> RecordBatch {
        let mut batch = RecordBatch::with_columns(columns.iter().copied());
        for values in rows {
            let row: Row = columns
                .iter()
                .zip(values.iter())
                .map(|(c, v)| (c.to_string(), Value::from(*v)))
                .collect();
            batch.push_row(row);
        }
        batch
    }

    #[test]
    fn test_column_name_patterns() {
        assert_eq!(check_column_name("dob"), Some("dob"));
        assert_eq!(check_column_name("Date-Of-Birth"), Some("birth"));
        assert_eq!(check_column_name("home_city"), Some("city"));
        assert_eq!(check_column_name("patient_first_name"), Some("first_name"));
        assert_eq!(check_column_name("age"), None);
        assert_eq!(check_column_name("diagnosis_code"), None);
        // "city" only matches as a whole word
        assert_eq!(check_column_name("ethnicity"), None);
    }

    #[test]
    fn test_value_patterns() {
        assert_eq!(check_value_pattern("ali@example.com").map(|p| p.0), Some("email"));
        assert_eq!(check_value_pattern("(555) 123-4567").map(|p| p.0), Some("phone"));
        assert_eq!(check_value_pattern("123-45-6789").map(|p| p.0), Some("ssn"));
        assert_eq!(check_value_pattern("K1A 0B1").map(|p| p.0), Some("postal"));
        assert_eq!(check_value_pattern("FLU"), None);
        assert_eq!(check_value_pattern("2024-01-15"), None);
        assert_eq!(check_value_pattern(""), None);
    }

    #[test]
    fn test_audit_flags_names_and_values() {
        let b = batch(
            &["age", "dob", "notes", "patient_hash"],
            &[&["30", "1990-01-01", "call ali@example.com", "abc"], &["31", "1991-02-02", "sara@example.org", "def"]],
        );
        let warnings = audit(&b);
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].column, "dob");
        assert_eq!(warnings[0].reason, AuditReason::ColumnName);
        assert_eq!(warnings[1].column, "notes");
        assert_eq!(warnings[1].reason, AuditReason::ColumnValue);
        assert_eq!(warnings[1].pattern, "email");
    }

    #[test]
    fn test_audit_clean_batch() {
        let b = batch(&["sex", "diagnosis_code"], &[&["F", "J11"]]);
        assert!(audit(&b).is_empty());
    }
}
