use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use csv::{Reader, ReaderBuilder};

use crate::batch::{RecordBatch, Row};
use crate::inference::infer_value;
use crate::types::Result;

use super::DataReader;

/// CSV/TSV file reader
pub struct CsvReader {
    path: PathBuf,
    delimiter: u8,
}

impl CsvReader {
    /// Create a new CSV reader
    pub fn new(path: &Path) -> Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
            delimiter: b',',
        })
    }

    /// Create a new TSV reader
    pub fn new_tsv(path: &Path) -> Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
            delimiter: b'\t',
        })
    }

    fn create_reader(&self) -> Result<Reader<BufReader<File>>> {
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let csv_reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        Ok(csv_reader)
    }
}

impl DataReader for CsvReader {
    fn read(&mut self) -> Result<RecordBatch> {
        let mut reader = self.create_reader()?;

        // Header names are kept verbatim; column matching is case-sensitive
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut batch = RecordBatch::with_columns(headers.iter().cloned());

        for result in reader.records() {
            let record = result?;

            // Cells past the header are dropped, short rows lack the trailing keys
            let row: Row = headers
                .iter()
                .zip(record.iter())
                .map(|(header, field)| (header.clone(), infer_value(field)))
                .collect();

            batch.push_row(row);
        }

        Ok(batch)
    }
}
