//! Tabular job data
//!
//! A [`Dataset`] is an ordered set of columns over rows of JSON scalar cells,
//! read from and written back to the crawler's JSON array of flat objects.
//! Every transformation returns a new dataset and leaves its input untouched.

use crate::error::{CleanError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

pub type Record = Map<String, Value>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Record>", into = "Vec<Record>")]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    /// Builds a dataset from flat records. Columns are the union of keys in
    /// first-seen order; keys missing from a record become `null`.
    pub fn from_records(records: Vec<Record>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for record in &records {
            for key in record.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }

        let rows = records
            .into_iter()
            .map(|mut record| {
                columns
                    .iter()
                    .map(|col| record.remove(col).unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    pub fn to_records(&self) -> Vec<Record> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Writes the dataset as pretty JSON, creating the parent directory if needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let json_output = serde_json::to_string_pretty(self)?;
        fs::write(path, json_output)?;
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| CleanError::MissingColumn {
                name: name.to_string(),
            })
    }

    pub fn column(&self, name: &str) -> Result<Vec<&Value>> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// Replaces the named column's values, or appends the column if absent.
    /// `values` must have one entry per row.
    pub fn with_column(&self, name: &str, values: Vec<Value>) -> Self {
        debug_assert_eq!(values.len(), self.rows.len());
        let mut out = self.clone();
        match out.columns.iter().position(|c| c == name) {
            Some(idx) => {
                for (row, value) in out.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                out.columns.push(name.to_string());
                for (row, value) in out.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        out
    }

    /// Applies `f` to every cell of one column. `f` receives the row index.
    pub fn map_column<F>(&self, name: &str, mut f: F) -> Result<Self>
    where
        F: FnMut(usize, &Value) -> Result<Value>,
    {
        let idx = self.column_index(name)?;
        let mut out = self.clone();
        for (i, row) in out.rows.iter_mut().enumerate() {
            row[idx] = f(i, &row[idx])?;
        }
        Ok(out)
    }

    /// Drops the first `n` columns (the crawler's keyword/location bookkeeping).
    pub fn drop_leading(&self, n: usize) -> Self {
        let n = n.min(self.columns.len());
        Self {
            columns: self.columns[n..].to_vec(),
            rows: self.rows.iter().map(|row| row[n..].to_vec()).collect(),
        }
    }

    pub fn drop_column(&self, name: &str) -> Result<Self> {
        let idx = self.column_index(name)?;
        let mut out = self.clone();
        out.columns.remove(idx);
        for row in &mut out.rows {
            row.remove(idx);
        }
        Ok(out)
    }

    /// Keeps the rows for which `keep` returns true, in order.
    pub fn filter_rows<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&[Value]) -> bool,
    {
        Self {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|row| keep(row))
                .cloned()
                .collect(),
        }
    }

    pub(crate) fn rows_mut(&mut self) -> &mut Vec<Vec<Value>> {
        &mut self.rows
    }
}

impl From<Vec<Record>> for Dataset {
    fn from(records: Vec<Record>) -> Self {
        Self::from_records(records)
    }
}

impl From<Dataset> for Vec<Record> {
    fn from(dataset: Dataset) -> Self {
        dataset.to_records()
    }
}

/// Stacks two cleaned batches. Both must carry the same set of columns; the
/// result keeps `first`'s column order. Rows are not deduplicated.
pub fn combine(first: &Dataset, second: &Dataset) -> Result<Dataset> {
    let left: BTreeSet<&String> = first.columns.iter().collect();
    let right: BTreeSet<&String> = second.columns.iter().collect();

    if left != right || first.columns.len() != second.columns.len() {
        return Err(CleanError::SchemaMismatch {
            missing: left.difference(&right).map(|c| c.to_string()).collect(),
            extra: right.difference(&left).map(|c| c.to_string()).collect(),
        });
    }

    let order = first
        .columns
        .iter()
        .map(|col| second.column_index(col))
        .collect::<Result<Vec<usize>>>()?;

    let mut out = first.clone();
    out.rows.extend(
        second
            .rows
            .iter()
            .map(|row| order.iter().map(|&idx| row[idx].clone()).collect()),
    );
    Ok(out)
}

/// Folds [`combine`] over any number of batches.
pub fn combine_all(batches: &[Dataset]) -> Result<Dataset> {
    let mut iter = batches.iter();
    let Some(first) = iter.next() else {
        return Ok(Dataset::default());
    };
    iter.try_fold(first.clone(), |acc, next| combine(&acc, next))
}

/// Reads a cell as a number. Numeric strings are accepted since some exports
/// quote every field.
pub fn cell_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dataset(value: Value) -> Dataset {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_columns_follow_first_seen_order() {
        let ds = dataset(json!([
            {"keyword": "data analyst", "jobkey": "a1"},
            {"keyword": "data analyst", "jobkey": "b2", "salarymin": 20.0}
        ]));
        assert_eq!(ds.columns(), ["keyword", "jobkey", "salarymin"]);
        assert_eq!(ds.rows()[0][2], Value::Null);
        assert_eq!(ds.len(), 2);
    }

    #[test]
    fn test_serializes_back_to_records() {
        let input = json!([{"b": 1, "a": "x"}, {"b": 2, "a": null}]);
        let ds = dataset(input.clone());
        assert_eq!(serde_json::to_value(&ds).unwrap(), input);
    }

    #[test]
    fn test_drop_leading_columns() {
        let ds = dataset(json!([{"keyword": "k", "location": "Remote", "jobkey": "a1"}]));
        let out = ds.drop_leading(2);
        assert_eq!(out.columns(), ["jobkey"]);
        assert_eq!(out.rows()[0], vec![json!("a1")]);
        assert_eq!(ds.columns().len(), 3);
    }

    #[test]
    fn test_drop_unknown_column_fails() {
        let ds = dataset(json!([{"jobkey": "a1"}]));
        assert!(matches!(
            ds.drop_column("jobDescription"),
            Err(CleanError::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_combine_reorders_second_batch() {
        let a = dataset(json!([{"jobkey": "a1", "post_age": 0}]));
        let b = dataset(json!([{"post_age": 3, "jobkey": "b2"}]));
        let out = combine(&a, &b).unwrap();
        assert_eq!(out.columns(), ["jobkey", "post_age"]);
        assert_eq!(out.rows()[1], vec![json!("b2"), json!(3)]);
    }

    #[test]
    fn test_combine_keeps_duplicates() {
        let a = dataset(json!([{"jobkey": "a1"}]));
        let out = combine(&a, &a).unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_combine_schema_mismatch() {
        let a = dataset(json!([{"jobkey": "a1", "post_age": 0}]));
        let b = dataset(json!([{"jobkey": "b2", "company": "Acme"}]));
        match combine(&a, &b) {
            Err(CleanError::SchemaMismatch { missing, extra }) => {
                assert_eq!(missing, vec!["post_age".to_string()]);
                assert_eq!(extra, vec!["company".to_string()]);
            }
            other => panic!("expected schema mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_combine_all_empty() {
        assert!(combine_all(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_cell_f64_accepts_numeric_strings() {
        assert_eq!(cell_f64(&json!(" 42.5 ")), Some(42.5));
        assert_eq!(cell_f64(&json!(17)), Some(17.0));
        assert_eq!(cell_f64(&json!("n/a")), None);
        assert_eq!(cell_f64(&Value::Null), None);
    }
}
