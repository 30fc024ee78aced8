use std::path::Path;

use serde::Serialize;

use crate::batch::RecordBatch;
use crate::privacy::{anonymize_with, audit, AnonymizationSummary, AuditWarning, IdentifierHasher};
use crate::readers::load_batch;
use crate::store::Store;
use crate::types::{Result, PREVIEW_ROWS};

/// Outcome of anonymizing a file, before anything is stored
#[derive(Debug, Clone)]
pub struct Anonymized {
    pub file_name: String,
    pub original: RecordBatch,
    pub batch: RecordBatch,
    pub summary: AnonymizationSummary,
    pub warnings: Vec<AuditWarning>,
}

/// What an ingest did
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub file_name: String,
    pub clinic: String,
    pub rows_read: usize,
    pub rows_stored: usize,
    pub removed_columns: Vec<String>,
    pub hashed_identifiers: bool,
    pub output_columns: Vec<String>,
    pub warnings: Vec<AuditWarning>,
    pub preview: RecordBatch,
    /// Raw rows before anonymization; shown locally, never serialized
    #[serde(skip)]
    pub original_preview: RecordBatch,
}

/// Load a file and anonymize it without touching the store
pub fn anonymize_file(path: &Path, hasher: &IdentifierHasher) -> Result<Anonymized> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();

    let original = load_batch(path)?;
    if original.is_empty() {
        tracing::warn!(file = %file_name, "File has no data rows");
    }
    let (batch, summary) = anonymize_with(&original, hasher);

    if summary.missing_identifiers > 0 {
        tracing::warn!(
            file = %file_name,
            rows = summary.missing_identifiers,
            "Rows without a patient_id were hashed from an empty identifier"
        );
    }
    if !summary.hashed_identifiers {
        tracing::info!(file = %file_name, "No patient_id column; no patient_hash produced");
    }

    let warnings = audit(&batch);

    Ok(Anonymized {
        file_name,
        original,
        batch,
        summary,
        warnings,
    })
}

/// Load, anonymize and store one clinic file
pub fn ingest_file(
    store: &mut Store,
    path: &Path,
    clinic: &str,
    hasher: &IdentifierHasher,
) -> Result<IngestReport> {
    let anonymized = anonymize_file(path, hasher)?;
    let rows_stored = store.insert_batch(&anonymized.batch, clinic)?;

    tracing::info!(
        file = %anonymized.file_name,
        clinic,
        rows = rows_stored,
        removed = anonymized.summary.removed_columns.len(),
        "Ingested file"
    );

    Ok(IngestReport {
        rows_read: anonymized.original.len(),
        rows_stored,
        clinic: clinic.trim().to_string(),
        removed_columns: anonymized.summary.removed_columns,
        hashed_identifiers: anonymized.summary.hashed_identifiers,
        output_columns: anonymized.batch.columns().to_vec(),
        warnings: anonymized.warnings,
        preview: anonymized.batch.head(PREVIEW_ROWS),
        original_preview: anonymized.original.head(PREVIEW_ROWS),
        file_name: anonymized.file_name,
    })
}
