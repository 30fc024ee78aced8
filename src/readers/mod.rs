pub mod csv;
pub mod excel;

use std::path::Path;

use crate::batch::RecordBatch;
use crate::types::{FileFormat, Result};

/// Common trait for visit record loaders
pub trait DataReader {
    /// Read the file into a record batch, header row as column names
    fn read(&mut self) -> Result<RecordBatch>;
}

/// Create a reader for the given file path
pub fn create_reader(path: &Path) -> Result<Box<dyn DataReader>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");

    let format = FileFormat::from_extension(ext).ok_or_else(|| {
        crate::error::Error::UnsupportedFormat(format!(
            "Unsupported file extension: .{}",
            ext
        ))
    })?;

    match format {
        FileFormat::Csv => Ok(Box::new(csv::CsvReader::new(path)?)),
        FileFormat::Tsv => Ok(Box::new(csv::CsvReader::new_tsv(path)?)),
        FileFormat::Excel => Ok(Box::new(excel::ExcelReader::new(path)?)),
    }
}

/// Load a file into a record batch
pub fn load_batch(path: &Path) -> Result<RecordBatch> {
    let mut reader = create_reader(path)?;
    let batch = reader.read()?;
    tracing::debug!(
        path = %path.display(),
        rows = batch.len(),
        columns = batch.columns().len(),
        "Loaded record batch"
    );
    Ok(batch)
}
