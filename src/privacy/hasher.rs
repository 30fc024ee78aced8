//! Pseudonymous patient identifier hashing.
//!
//! Identifiers are hashed with SHA-256 and the lowercase hex digest is cut to a
//! fixed prefix. There is no salt or key: the same identifier always maps to the
//! same token, across uploads and across clinics. Small identifier spaces such as
//! `P001`..`P999` can be recovered by anyone who hashes the candidates, so this
//! only guards against casual exposure.
//!
//! Truncation trades collision safety for compact storage. With the default of
//! 16 hex characters (64 bits) the birthday bound puts a 50% chance of at least
//! one collision at roughly 2^32 distinct identifiers.
//!
//! The loader trims surrounding whitespace from every cell, quoted or not, so
//! `" P001 "` and `P001` hash to the same token. The hashed string is the
//! identifier as stored after that trim.

use sha2::{Digest, Sha256};

use crate::error::Error;
use crate::types::{Result, DEFAULT_HASH_LENGTH, MAX_HASH_LENGTH};

/// Hashes raw identifiers into fixed-length hex tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentifierHasher {
    length: usize,
}

impl IdentifierHasher {
    /// Create a hasher keeping `length` hex characters of the digest
    pub fn new(length: usize) -> Result<Self> {
        if length == 0 || length > MAX_HASH_LENGTH {
            return Err(Error::InvalidInput(format!(
                "Hash length must be between 1 and {}, got {}",
                MAX_HASH_LENGTH, length
            )));
        }

        let hasher = Self { length };
        if length < DEFAULT_HASH_LENGTH {
            tracing::warn!(
                length,
                collision_bound = hasher.collision_bound(),
                "Hash length below default; patient hash collisions become likely at small scale"
            );
        }

        Ok(hasher)
    }

    /// Number of hex characters in each token
    pub fn length(&self) -> usize {
        self.length
    }

    /// Hash the string form of a raw identifier
    pub fn hash(&self, raw: &str) -> String {
        let digest = Sha256::digest(raw.as_bytes());
        let mut hex = format!("{:x}", digest);
        hex.truncate(self.length);
        hex
    }

    /// Approximate number of distinct identifiers at which the chance of at
    /// least one collision reaches 50% (birthday bound, 1.1774 * sqrt(2^bits)).
    pub fn collision_bound(&self) -> f64 {
        let bits = (self.length * 4) as f64;
        1.1774 * (bits / 2.0).exp2()
    }
}

impl Default for IdentifierHasher {
    fn default() -> Self {
        Self {
            length: DEFAULT_HASH_LENGTH,
        }
    }
}

/// Hash a raw identifier with the default token length
#[cfg(test)]
pub fn hash_id(raw: &str) -> String {
    IdentifierHasher::default().hash(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_known_digest_prefix() {
        // sha256("abc") = ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad
        assert_eq!(hash_id("abc"), "ba7816bf8f01cfea");
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(hash_id("P001"), hash_id("P001"));
        assert_ne!(hash_id("P001"), hash_id("P002"));
    }

    #[test]
    fn test_fixed_length_lowercase_hex() {
        for input in ["", "P001", "42", "a much longer identifier with spaces", "Ünïcødé"] {
            let h = hash_id(input);
            assert_eq!(h.len(), 16);
            assert!(h.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
        }
    }

    #[test]
    fn test_no_collisions_in_sample() {
        let hashes: HashSet<String> = (0..10_000).map(|i| hash_id(&format!("P{:05}", i))).collect();
        assert_eq!(hashes.len(), 10_000);
    }

    #[test]
    fn test_configurable_length_is_prefix() {
        let full = IdentifierHasher::new(64).unwrap().hash("P001");
        let short = IdentifierHasher::new(8).unwrap().hash("P001");
        assert_eq!(full.len(), 64);
        assert_eq!(short.len(), 8);
        assert!(full.starts_with(&short));
        assert!(full.starts_with(&hash_id("P001")));
    }

    #[test]
    fn test_invalid_length() {
        assert!(IdentifierHasher::new(0).is_err());
        assert!(IdentifierHasher::new(65).is_err());
    }

    #[test]
    fn test_collision_bound_default() {
        let bound = IdentifierHasher::default().collision_bound();
        // ~2^32 for 64 bits
        assert!(bound > 4.0e9 && bound < 6.0e9);
    }
}
