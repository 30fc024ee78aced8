use std::fmt;

use serde::Serialize;

/// A count as reported in analytics: exact, or a privacy range
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SafeCount {
    Exact(u64),
    Range(&'static str),
}

impl SafeCount {
    /// Exact value, if not bucketed
    pub fn exact(&self) -> Option<u64> {
        match self {
            SafeCount::Exact(n) => Some(*n),
            SafeCount::Range(_) => None,
        }
    }
}

impl fmt::Display for SafeCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SafeCount::Exact(n) => write!(f, "{}", n),
            SafeCount::Range(r) => f.write_str(r),
        }
    }
}

/// Bucket a count into a privacy-safe range
pub fn bucket_count(n: u64) -> &'static str {
    match n {
        0 => "0",
        1 => "1",
        2..=5 => "2-5",
        6..=10 => "6-10",
        11..=20 => "11-20",
        21..=100 => "21-100",
        101..=1000 => "101-1000",
        _ => ">1000",
    }
}

/// Report a count exactly or as its bucket
pub fn safe_count(n: u64, bucket: bool) -> SafeCount {
    if bucket {
        SafeCount::Range(bucket_count(n))
    } else {
        SafeCount::Exact(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_edges() {
        assert_eq!(bucket_count(0), "0");
        assert_eq!(bucket_count(1), "1");
        assert_eq!(bucket_count(2), "2-5");
        assert_eq!(bucket_count(5), "2-5");
        assert_eq!(bucket_count(6), "6-10");
        assert_eq!(bucket_count(20), "11-20");
        assert_eq!(bucket_count(21), "21-100");
        assert_eq!(bucket_count(1000), "101-1000");
        assert_eq!(bucket_count(1001), ">1000");
    }

    #[test]
    fn test_safe_count() {
        assert_eq!(safe_count(15, true), SafeCount::Range("11-20"));
        assert_eq!(safe_count(15, false), SafeCount::Exact(15));
    }

    #[test]
    fn test_safe_count_serialization() {
        assert_eq!(serde_json::to_string(&safe_count(7, false)).unwrap(), "7");
        assert_eq!(serde_json::to_string(&safe_count(7, true)).unwrap(), "\"6-10\"");
    }
}
