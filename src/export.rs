use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::batch::RecordBatch;
use crate::store::{Store, StoredRecord};
use crate::types::Result;

/// Write stored records as CSV with a header row
pub fn write_csv<W: Write>(records: &[StoredRecord], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    if records.is_empty() {
        csv_writer.write_record([
            "id",
            "clinic",
            "patient_hash",
            "age",
            "sex",
            "visit_date",
            "diagnosis_code",
            "created_at",
        ])?;
    }
    for record in records {
        csv_writer.serialize(record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write a record batch as CSV in its column order
pub fn write_batch_csv<W: Write>(batch: &RecordBatch, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(batch.columns())?;
    for index in 0..batch.len() {
        let fields: Vec<String> = batch
            .ordered_values(index)
            .into_iter()
            .map(|v| v.to_string())
            .collect();
        csv_writer.write_record(&fields)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// File name used for a store export taken now
pub fn export_file_name() -> String {
    format!(
        "medical_data_export_{}.csv",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    )
}

/// Export every stored record to a timestamped CSV file in `dir`.
/// Returns `None` when there is nothing to export.
pub fn export_to_dir(store: &Store, dir: &Path) -> Result<Option<PathBuf>> {
    let records = store.records()?;
    if records.is_empty() {
        tracing::info!("No stored records; nothing exported");
        return Ok(None);
    }

    std::fs::create_dir_all(dir)?;
    let path = dir.join(export_file_name());
    let file = File::create(&path)?;
    write_csv(&records, std::io::BufWriter::new(file))?;

    tracing::info!(path = %path.display(), records = records.len(), "Exported records");
    Ok(Some(path))
}
