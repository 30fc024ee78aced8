//! SQLite persistence for anonymized visit records.
//!
//! A [`Store`] owns its connection; there is no process-wide database path.
//! The connection is closed when the handle is dropped.

use std::path::Path;

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::batch::{RecordBatch, Row};
use crate::error::Error;
use crate::inference::normalize_date;
use crate::types::{Result, Value, PATIENT_HASH_COLUMN};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS patients (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    clinic TEXT NOT NULL,
    patient_hash TEXT,
    age INTEGER,
    sex TEXT,
    visit_date TEXT,
    diagnosis_code TEXT,
    created_at TEXT DEFAULT CURRENT_TIMESTAMP
);
";

/// Batch columns persisted by the store; anything else is not stored
pub const STORED_COLUMNS: &[&str] = &[
    PATIENT_HASH_COLUMN,
    "age",
    "sex",
    "visit_date",
    "diagnosis_code",
];

/// An anonymized row with the storage schema applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub clinic: String,
    pub patient_hash: Option<String>,
    pub age: Option<i64>,
    pub sex: Option<String>,
    pub visit_date: Option<String>,
    pub diagnosis_code: Option<String>,
    pub created_at: String,
}

impl NormalizedRecord {
    pub fn from_row(row: &Row, clinic: &str, created_at: &str) -> Self {
        let get = |column: &str| row.get(column).cloned().unwrap_or(Value::Null);

        let visit_date = get("visit_date")
            .as_text()
            .map(|raw| normalize_date(&raw).unwrap_or(raw));

        Self {
            clinic: clinic.to_string(),
            patient_hash: get(PATIENT_HASH_COLUMN).as_text(),
            age: get("age").as_i64(),
            sex: get("sex").as_text(),
            visit_date,
            diagnosis_code: get("diagnosis_code").as_text(),
            created_at: created_at.to_string(),
        }
    }
}

/// A record as read back from the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: i64,
    pub clinic: String,
    pub patient_hash: Option<String>,
    pub age: Option<i64>,
    pub sex: Option<String>,
    pub visit_date: Option<String>,
    pub diagnosis_code: Option<String>,
    pub created_at: Option<String>,
}

/// Handle to the shared visit record database
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (creating if needed) the database at `path`
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        tracing::debug!(path = %path.display(), "Opened database");
        Self::with_connection(conn)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Append every row of an anonymized batch tagged with `clinic`.
    ///
    /// All rows go in one transaction; on error nothing is written.
    pub fn insert_batch(&mut self, batch: &RecordBatch, clinic: &str) -> Result<usize> {
        let clinic = clinic.trim();
        if clinic.is_empty() {
            return Err(Error::InvalidInput("Clinic label must not be empty".to_string()));
        }

        let ignored: Vec<&String> = batch
            .columns()
            .iter()
            .filter(|c| !STORED_COLUMNS.contains(&c.as_str()))
            .collect();
        if !ignored.is_empty() {
            tracing::debug!(columns = ?ignored, "Columns outside the storage schema are not persisted");
        }

        let created_at = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO patients (clinic, patient_hash, age, sex, visit_date, diagnosis_code, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;

            for row in batch.rows() {
                let record = NormalizedRecord::from_row(row, clinic, &created_at);
                stmt.execute(params![
                    record.clinic,
                    record.patient_hash,
                    record.age,
                    record.sex,
                    record.visit_date,
                    record.diagnosis_code,
                    record.created_at,
                ])?;
            }
        }
        tx.commit()?;

        tracing::info!(clinic, rows = batch.len(), "Stored anonymized batch");
        Ok(batch.len())
    }

    /// All stored records ordered by id
    pub fn records(&self) -> Result<Vec<StoredRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, clinic, patient_hash, age, sex, visit_date, diagnosis_code, created_at
             FROM patients ORDER BY id",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(StoredRecord {
                id: row.get(0)?,
                clinic: row.get(1)?,
                patient_hash: row.get(2)?,
                age: row.get(3)?,
                sex: row.get(4)?,
                visit_date: row.get(5)?,
                diagnosis_code: row.get(6)?,
                created_at: row.get(7)?,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// Number of stored records
    pub fn count(&self) -> Result<u64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?;
        Ok(n as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::privacy::{anonymize, hash_id};

    fn visit(pairs: &[(&str, Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn sample_batch() -> RecordBatch {
        RecordBatch::from_rows(vec![
            visit(&[
                ("patient_id", "P001".into()),
                ("name", "Ali Khan".into()),
                ("age", Value::Integer(25)),
                ("sex", "M".into()),
                ("visit_date", "01/15/2024".into()),
                ("diagnosis_code", "J11".into()),
            ]),
            visit(&[
                ("patient_id", "P002".into()),
                ("age", Value::Null),
                ("diagnosis", "COLD".into()),
            ]),
        ])
    }

    #[test]
    fn test_insert_and_read_back() {
        let mut store = Store::open_in_memory().unwrap();
        let batch = anonymize(&sample_batch());

        assert_eq!(store.insert_batch(&batch, "Clinic_A").unwrap(), 2);
        assert_eq!(store.count().unwrap(), 2);

        let records = store.records().unwrap();
        assert_eq!(records[0].id, 1);
        assert_eq!(records[0].clinic, "Clinic_A");
        assert_eq!(records[0].patient_hash, Some(hash_id("P001")));
        assert_eq!(records[0].age, Some(25));
        assert_eq!(records[0].visit_date.as_deref(), Some("2024-01-15"));
        assert_eq!(records[0].diagnosis_code.as_deref(), Some("J11"));
        assert!(records[0].created_at.is_some());

        assert_eq!(records[1].age, None);
        assert_eq!(records[1].sex, None);
        assert_eq!(records[1].diagnosis_code, None);
    }

    #[test]
    fn test_append_only_across_batches() {
        let mut store = Store::open_in_memory().unwrap();
        let batch = anonymize(&sample_batch());
        store.insert_batch(&batch, "Clinic_A").unwrap();
        store.insert_batch(&batch, "Clinic_B").unwrap();

        let records = store.records().unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(records[2].clinic, "Clinic_B");
        // Same raw identifier, same hash across clinics
        assert_eq!(records[0].patient_hash, records[2].patient_hash);
    }

    #[test]
    fn test_blank_clinic_rejected() {
        let mut store = Store::open_in_memory().unwrap();
        let batch = anonymize(&sample_batch());
        assert!(matches!(
            store.insert_batch(&batch, "   "),
            Err(Error::InvalidInput(_))
        ));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_failed_batch_rolls_back() {
        let mut store = Store::open_in_memory().unwrap();
        store
            .conn
            .execute_batch(
                "CREATE TRIGGER reject_age BEFORE INSERT ON patients
                 WHEN NEW.age = 99
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();

        let batch = RecordBatch::from_rows(
            [1, 99, 2]
                .iter()
                .map(|age| visit(&[("patient_hash", "abc".into()), ("age", Value::Integer(*age))]))
                .collect(),
        );

        assert!(matches!(
            store.insert_batch(&batch, "Clinic_A"),
            Err(Error::Database(_))
        ));
        assert_eq!(store.count().unwrap(), 0);

        // The connection is still usable after the rollback
        let ok = RecordBatch::from_rows(vec![visit(&[("age", Value::Integer(3))])]);
        assert_eq!(store.insert_batch(&ok, "Clinic_A").unwrap(), 1);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_unparseable_values_stored_leniently() {
        let mut store = Store::open_in_memory().unwrap();
        let batch = RecordBatch::from_rows(vec![visit(&[
            ("age", "unknown".into()),
            ("visit_date", "last week".into()),
        ])]);
        store.insert_batch(&batch, "Clinic_C").unwrap();

        let record = &store.records().unwrap()[0];
        assert_eq!(record.age, None);
        assert_eq!(record.visit_date.as_deref(), Some("last week"));
        assert_eq!(record.patient_hash, None);
    }

    #[test]
    fn test_on_disk_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lake.db");
        {
            let mut store = Store::open(&path).unwrap();
            store
                .insert_batch(&anonymize(&sample_batch()), "Clinic_A")
                .unwrap();
        }
        let store = Store::open(&path).unwrap();
        assert_eq!(store.count().unwrap(), 2);
    }
}
