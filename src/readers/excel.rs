use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader, Sheets};

use crate::batch::{RecordBatch, Row};
use crate::error::Error;
use crate::inference::{infer_value, is_missing};
use crate::types::{Result, Value};

use super::DataReader;

/// Excel file reader (supports .xlsx, .xls, .xlsm, .xlsb). Reads the first sheet.
pub struct ExcelReader {
    path: PathBuf,
}

impl ExcelReader {
    pub fn new(path: &Path) -> Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Convert an Excel cell to a typed value
    fn data_to_value(dt: &Data) -> Value {
        match dt {
            Data::Empty | Data::Error(_) => Value::Null,
            Data::String(s) if is_missing(s) => Value::Null,
            // Text cells go through the same inference as CSV so "007" stays text
            Data::String(s) => infer_value(s),
            Data::Int(i) => Value::Integer(*i),
            Data::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                Value::Integer(*f as i64)
            }
            Data::Float(f) => Value::Float(*f),
            Data::Bool(b) => Value::Text(b.to_string()),
            Data::DateTime(d) => Value::Text(Self::excel_serial_to_date_string(d.as_f64())),
            Data::DateTimeIso(s) | Data::DurationIso(s) => Value::Text(s.clone()),
        }
    }

    /// Convert Excel serial date to ISO date string
    fn excel_serial_to_date_string(serial: f64) -> String {
        // Excel epoch is 1899-12-30 (with the 1900 leap year bug)
        let days = serial as i64;
        chrono::NaiveDate::from_ymd_opt(1899, 12, 30)
            .and_then(|base| base.checked_add_signed(chrono::Duration::days(days)))
            .map(|date| date.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| serial.to_string())
    }
}

impl DataReader for ExcelReader {
    fn read(&mut self) -> Result<RecordBatch> {
        let mut workbook: Sheets<std::io::BufReader<std::fs::File>> =
            open_workbook_auto(&self.path)?;

        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| Error::InvalidInput("Workbook has no sheets".to_string()))?;

        let range = workbook.worksheet_range(&sheet_name).map_err(Error::Excel)?;

        let mut rows = range.rows();

        // First row is headers
        let headers: Vec<String> = match rows.next() {
            Some(row) => row
                .iter()
                .enumerate()
                .map(|(idx, cell)| match cell {
                    Data::Empty => format!("Column{}", idx + 1),
                    other => other.to_string(),
                })
                .collect(),
            None => return Ok(RecordBatch::new()),
        };

        let mut batch = RecordBatch::with_columns(headers.iter().cloned());

        for cells in rows {
            let row: Row = headers
                .iter()
                .zip(cells.iter())
                .map(|(header, cell)| (header.clone(), Self::data_to_value(cell)))
                .collect();
            batch.push_row(row);
        }

        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_to_value() {
        assert_eq!(ExcelReader::data_to_value(&Data::Empty), Value::Null);
        assert_eq!(
            ExcelReader::data_to_value(&Data::String("P001".to_string())),
            Value::from("P001")
        );
        assert_eq!(
            ExcelReader::data_to_value(&Data::String("NA".to_string())),
            Value::Null
        );
        assert_eq!(ExcelReader::data_to_value(&Data::Int(42)), Value::Integer(42));
        assert_eq!(ExcelReader::data_to_value(&Data::Float(25.0)), Value::Integer(25));
        assert_eq!(ExcelReader::data_to_value(&Data::Float(3.25)), Value::Float(3.25));
        assert_eq!(ExcelReader::data_to_value(&Data::Bool(true)), Value::from("true"));
    }

    #[test]
    fn test_excel_serial_to_date() {
        // Excel serial date 44927 should be 2023-01-01
        let result = ExcelReader::excel_serial_to_date_string(44927.0);
        assert_eq!(result, "2023-01-01");
    }

    #[test]
    fn test_invalid_workbook() {
        let file = tempfile::NamedTempFile::with_suffix(".xlsx").unwrap();
        let mut reader = ExcelReader::new(file.path()).unwrap();
        assert!(reader.read().is_err());
    }
}
