use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::Value;

/// Missing value tokens
pub const MISSING_TOKENS: &[&str] = &[
    "", "NA", "N/A", "na", "n/a", "NULL", "null", "NaN", "nan", "None", "none", "#N/A",
];

// Visit date formats accepted at the storage boundary
static DATE_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        // ISO format: 2024-01-15
        (Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap(), "%Y-%m-%d"),
        // US format: 01/15/2024 or 1/15/2024
        (Regex::new(r"^\d{1,2}/\d{1,2}/\d{4}$").unwrap(), "%m/%d/%Y"),
        // European format: 15-01-2024
        (Regex::new(r"^\d{1,2}-\d{1,2}-\d{4}$").unwrap(), "%d-%m-%Y"),
        // ISO with dots: 2024.01.15
        (Regex::new(r"^\d{4}\.\d{2}\.\d{2}$").unwrap(), "%Y.%m.%d"),
        // Month name: Jan 15, 2024 or January 15, 2024
        (
            Regex::new(r"^[A-Za-z]{3,9}\s+\d{1,2},?\s+\d{4}$").unwrap(),
            "%B %d %Y",
        ),
    ]
});

/// Check if a value represents a missing value
pub fn is_missing(value: &str) -> bool {
    let trimmed = value.trim();
    MISSING_TOKENS.iter().any(|t| trimmed.eq_ignore_ascii_case(t))
}

/// Convert a raw cell to a typed value.
///
/// Numbers are only recognised when their canonical form reproduces the
/// trimmed text, so `007` or `3.50` stay text and identifiers hash the same
/// whatever the loader decided.
pub fn infer_value(raw: &str) -> Value {
    if is_missing(raw) {
        return Value::Null;
    }

    let trimmed = raw.trim();

    if let Ok(i) = trimmed.parse::<i64>() {
        if i.to_string() == trimmed {
            return Value::Integer(i);
        }
    }

    if let Ok(f) = trimmed.parse::<f64>() {
        if f.is_finite() && f.to_string() == trimmed {
            return Value::Float(f);
        }
    }

    Value::Text(trimmed.to_string())
}

/// Normalize a date to `YYYY-MM-DD` if it matches a known format
pub fn normalize_date(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    for (pattern, format) in DATE_PATTERNS.iter() {
        if pattern.is_match(trimmed) {
            let candidate = trimmed.replace(',', "");
            if let Ok(date) = NaiveDate::parse_from_str(&candidate, format) {
                return Some(date.format("%Y-%m-%d").to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_missing() {
        assert!(is_missing(""));
        assert!(is_missing("  "));
        assert!(is_missing("NA"));
        assert!(is_missing("N/A"));
        assert!(is_missing("null"));
        assert!(is_missing("#N/A"));
        assert!(!is_missing("0"));
        assert!(!is_missing("FLU"));
    }

    #[test]
    fn test_infer_value() {
        assert_eq!(infer_value("42"), Value::Integer(42));
        assert_eq!(infer_value("-7"), Value::Integer(-7));
        assert_eq!(infer_value("25.5"), Value::Float(25.5));
        assert_eq!(infer_value("P001"), Value::from("P001"));
        assert_eq!(infer_value(" FLU "), Value::from("FLU"));
        assert_eq!(infer_value("NA"), Value::Null);
    }

    #[test]
    fn test_infer_value_keeps_non_canonical_numbers_as_text() {
        assert_eq!(infer_value("007"), Value::from("007"));
        assert_eq!(infer_value("3.50"), Value::from("3.50"));
        assert_eq!(infer_value("+5"), Value::from("+5"));
        assert_eq!(infer_value("1e3"), Value::from("1e3"));
    }

    #[test]
    fn test_string_form_round_trips() {
        for raw in ["P001", "1042", "007", "25.5", "3.50", "Ali Khan"] {
            assert_eq!(infer_value(raw).to_string(), raw);
        }
    }

    #[test]
    fn test_normalize_date() {
        assert_eq!(normalize_date("2024-01-15"), Some("2024-01-15".to_string()));
        assert_eq!(normalize_date("01/15/2024"), Some("2024-01-15".to_string()));
        assert_eq!(normalize_date("15-01-2024"), Some("2024-01-15".to_string()));
        assert_eq!(normalize_date("2024.01.15"), Some("2024-01-15".to_string()));
        assert_eq!(normalize_date("January 15, 2024"), Some("2024-01-15".to_string()));
        assert_eq!(normalize_date("Jan 15 2024"), Some("2024-01-15".to_string()));
        assert_eq!(normalize_date("2024-13-45"), None);
        assert_eq!(normalize_date("last week"), None);
    }
}
