use serde::Serialize;

use crate::batch::RecordBatch;
use crate::types::{Value, PATIENT_HASH_COLUMN, PATIENT_ID_COLUMN, PII_COLUMNS};

use super::hasher::IdentifierHasher;

/// What the transform did to a batch
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnonymizationSummary {
    pub removed_columns: Vec<String>,
    pub hashed_identifiers: bool,
    pub missing_identifiers: usize,
}

/// Strip PII columns and replace `patient_id` with `patient_hash` using the
/// default hash length. The input batch is left untouched.
#[cfg(test)]
pub fn anonymize(batch: &RecordBatch) -> RecordBatch {
    anonymize_with(batch, &IdentifierHasher::default()).0
}

/// Strip PII columns and replace `patient_id` with `patient_hash` hashed by
/// `hasher`, reporting what changed. The input batch is left untouched.
pub fn anonymize_with(
    batch: &RecordBatch,
    hasher: &IdentifierHasher,
) -> (RecordBatch, AnonymizationSummary) {
    let mut out = batch.clone();
    let mut summary = AnonymizationSummary::default();

    for column in PII_COLUMNS {
        if out.remove_column(column) {
            summary.removed_columns.push(column.to_string());
        }
    }

    if out.has_column(PATIENT_ID_COLUMN) {
        let hashes: Vec<Value> = out
            .column_values(PATIENT_ID_COLUMN)
            .map(|id| {
                if id.is_null() {
                    summary.missing_identifiers += 1;
                }
                Value::Text(hasher.hash(&id.to_string()))
            })
            .collect();

        out.set_column(PATIENT_HASH_COLUMN, hashes);
        out.remove_column(PATIENT_ID_COLUMN);
        summary.hashed_identifiers = true;
    }

    (out, summary)
}
