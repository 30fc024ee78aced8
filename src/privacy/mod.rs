pub mod anonymize;
pub mod audit;
pub mod bucketing;
pub mod hasher;

#[cfg(test)]
pub use anonymize::anonymize;
pub use anonymize::{anonymize_with, AnonymizationSummary};
pub use audit::{audit, AuditWarning};
pub use bucketing::{safe_count, SafeCount};
#[cfg(test)]
pub use hasher::hash_id;
pub use hasher::IdentifierHasher;
