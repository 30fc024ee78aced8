use std::collections::HashMap;

use serde::Serialize;

use crate::types::Value;

/// One record: column name to value
pub type Row = HashMap<String, Value>;

static NULL: Value = Value::Null;

/// Ordered rows sharing an advisory (not enforced) set of columns
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecordBatch {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl RecordBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a batch from rows, collecting columns in first-seen order.
    /// Column order within a row is not known for a map, so keys new to the
    /// batch are appended sorted.
    #[cfg(test)]
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let mut batch = Self::new();
        for row in rows {
            batch.push_row(row);
        }
        batch
    }

    /// Create an empty batch with a known column order
    pub fn with_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut batch = Self::new();
        for column in columns {
            let column = column.into();
            if !batch.has_column(&column) {
                batch.columns.push(column);
            }
        }
        batch
    }

    pub fn push_row(&mut self, row: Row) {
        let mut new_columns: Vec<&String> = row
            .keys()
            .filter(|k| !self.columns.iter().any(|c| c == *k))
            .collect();
        new_columns.sort();
        let new_columns: Vec<String> = new_columns.into_iter().cloned().collect();
        self.columns.extend(new_columns);
        self.rows.push(row);
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value of `column` in row `index`; absent keys read as null
    pub fn value(&self, index: usize, column: &str) -> &Value {
        self.rows
            .get(index)
            .and_then(|row| row.get(column))
            .unwrap_or(&NULL)
    }

    /// Values of one column, one per row
    pub fn column_values<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.rows
            .iter()
            .map(move |row| row.get(column).unwrap_or(&NULL))
    }

    /// Remove a column from the column list and every row. Returns whether it existed.
    pub fn remove_column(&mut self, name: &str) -> bool {
        let Some(pos) = self.columns.iter().position(|c| c == name) else {
            return false;
        };
        self.columns.remove(pos);
        for row in &mut self.rows {
            row.remove(name);
        }
        true
    }

    /// Set a column to the given per-row values, appending it to the column
    /// list if new and keeping its position otherwise.
    pub fn set_column(&mut self, name: &str, values: Vec<Value>) {
        debug_assert_eq!(values.len(), self.rows.len());
        if !self.has_column(name) {
            self.columns.push(name.to_string());
        }
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.insert(name.to_string(), value);
        }
    }

    /// Values of a row in column order
    pub fn ordered_values(&self, index: usize) -> Vec<&Value> {
        self.columns
            .iter()
            .map(|c| self.value(index, c))
            .collect()
    }

    /// First `n` rows as a new batch with the same columns
    pub fn head(&self, n: usize) -> RecordBatch {
        RecordBatch {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_with_columns_keeps_order() {
        let batch = RecordBatch::with_columns(["b", "a", "b", "c"]);
        assert_eq!(batch.columns(), &["b", "a", "c"]);
        assert!(batch.is_empty());
    }

    #[test]
    fn test_from_rows_collects_union_of_columns() {
        let batch = RecordBatch::from_rows(vec![
            row(&[("age", Value::Integer(30))]),
            row(&[("age", Value::Integer(31)), ("sex", "F".into())]),
        ]);
        assert_eq!(batch.columns(), &["age", "sex"]);
        assert_eq!(batch.len(), 2);
        assert!(batch.value(0, "sex").is_null());
    }

    #[test]
    fn test_has_column_is_case_sensitive() {
        let batch = RecordBatch::with_columns(["Name"]);
        assert!(batch.has_column("Name"));
        assert!(!batch.has_column("name"));
    }

    #[test]
    fn test_remove_column() {
        let mut batch = RecordBatch::from_rows(vec![row(&[
            ("name", "Ali".into()),
            ("age", Value::Integer(25)),
        ])]);
        assert!(batch.remove_column("name"));
        assert!(!batch.remove_column("name"));
        assert_eq!(batch.columns(), &["age"]);
        assert!(!batch.rows()[0].contains_key("name"));
    }

    #[test]
    fn test_set_column_appends_or_keeps_position() {
        let mut batch = RecordBatch::with_columns(["x", "y"]);
        batch.push_row(row(&[("x", Value::Integer(1))]));

        batch.set_column("z", vec![Value::Integer(3)]);
        assert_eq!(batch.columns(), &["x", "y", "z"]);

        batch.set_column("x", vec![Value::Integer(9)]);
        assert_eq!(batch.columns(), &["x", "y", "z"]);
        assert_eq!(batch.value(0, "x"), &Value::Integer(9));
    }

    #[test]
    fn test_ordered_values_and_head() {
        let mut batch = RecordBatch::with_columns(["a", "b"]);
        for i in 0..3 {
            batch.push_row(row(&[("b", Value::Integer(i)), ("a", Value::Integer(i * 10))]));
        }
        assert_eq!(
            batch.ordered_values(1),
            vec![&Value::Integer(10), &Value::Integer(1)]
        );
        let head = batch.head(2);
        assert_eq!(head.len(), 2);
        assert_eq!(head.columns(), batch.columns());
    }
}
