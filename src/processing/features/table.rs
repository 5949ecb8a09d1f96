// src/processing/features/table.rs
//! Column-named feature tables

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::FeatureError;
use crate::config::constants::validation::REQUIRED_COLUMNS;

/// One table cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Missing,
}

impl CellValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(v) => Some(*v as f64),
            CellValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        match self {
            CellValue::Missing => true,
            CellValue::Float(v) => v.is_nan(),
            _ => false,
        }
    }
}

/// CSV rendering: undefined values are empty, booleans are `True`/`False`
impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Int(v) => write!(f, "{}", v),
            CellValue::Float(v) if v.is_nan() => Ok(()),
            CellValue::Float(v) => write!(f, "{}", v),
            CellValue::Bool(true) => f.write_str("True"),
            CellValue::Bool(false) => f.write_str("False"),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Missing => Ok(()),
        }
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Float(v)
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        CellValue::Int(v)
    }
}

impl From<usize> for CellValue {
    fn from(v: usize) -> Self {
        CellValue::Int(v as i64)
    }
}

impl From<bool> for CellValue {
    fn from(v: bool) -> Self {
        CellValue::Bool(v)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        CellValue::Text(v.to_string())
    }
}

impl From<Option<f64>> for CellValue {
    fn from(v: Option<f64>) -> Self {
        v.map_or(CellValue::Missing, CellValue::Float)
    }
}

/// Rows of cycles, columns of named features
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureTable {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl FeatureTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    /// Build from row-major data, checking every row's width
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Result<Self, FeatureError> {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Build from named columns of equal length
    pub fn from_columns(columns: Vec<(String, Vec<CellValue>)>) -> Result<Self, FeatureError> {
        let height = columns.first().map_or(0, |(_, values)| values.len());
        if let Some((name, values)) = columns.iter().find(|(_, values)| values.len() != height) {
            return Err(FeatureError::MalformedOutput(format!(
                "column '{}' has {} values, expected {}",
                name,
                values.len(),
                height
            )));
        }

        let names = columns.iter().map(|(name, _)| name.clone()).collect();
        let mut value_columns: Vec<std::vec::IntoIter<CellValue>> =
            columns.into_iter().map(|(_, values)| values.into_iter()).collect();
        let rows = (0..height)
            .map(|_| value_columns.iter_mut().filter_map(|values| values.next()).collect())
            .collect();

        Ok(Self { columns: names, rows })
    }

    /// Build from keyed records; columns follow first appearance, absent keys are missing
    pub fn from_records(records: Vec<BTreeMap<String, CellValue>>) -> Self {
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
                    .map(|column| record.remove(column).unwrap_or(CellValue::Missing))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    pub fn push_row(&mut self, row: Vec<CellValue>) -> Result<(), FeatureError> {
        if row.len() != self.columns.len() {
            return Err(FeatureError::MalformedOutput(format!(
                "row has {} values, expected {}",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All values of one column
    pub fn column(&self, name: &str) -> Option<Vec<&CellValue>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }

    /// Copy with `trial`, `channel_idx`, `channel_label` prepended to every row
    pub fn annotate(&self, trial: usize, channel: usize, label: &str) -> FeatureTable {
        let columns = REQUIRED_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(self.columns.iter().cloned())
            .collect();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut annotated = Vec::with_capacity(row.len() + 3);
                annotated.push(CellValue::from(trial));
                annotated.push(CellValue::from(channel));
                annotated.push(CellValue::from(label));
                annotated.extend(row.iter().cloned());
                annotated
            })
            .collect();
        FeatureTable { columns, rows }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_display_rules() {
        assert_eq!(CellValue::Bool(true).to_string(), "True");
        assert_eq!(CellValue::Float(f64::NAN).to_string(), "");
        assert_eq!(CellValue::Missing.to_string(), "");
        assert_eq!(CellValue::Float(0.25).to_string(), "0.25");
        assert_eq!(CellValue::Int(-4).to_string(), "-4");
    }

    #[test]
    fn test_annotate_prepends_identity() {
        let table = FeatureTable::from_rows(
            cols(&["period", "is_burst"]),
            vec![
                vec![CellValue::Int(40), CellValue::Bool(true)],
                vec![CellValue::Int(42), CellValue::Bool(false)],
            ],
        )
        .unwrap();

        let annotated = table.annotate(1, 2, "CA1");
        assert_eq!(annotated.columns()[..4], cols(&["trial", "channel_idx", "channel_label", "period"])[..]);
        assert_eq!(annotated.rows()[1][0], CellValue::Int(1));
        assert_eq!(annotated.rows()[1][2], CellValue::Text("CA1".into()));
        // Source table untouched
        assert_eq!(table.columns().len(), 2);
    }

    #[test]
    fn test_from_columns_and_records() {
        let table = FeatureTable::from_columns(vec![
            ("a".to_string(), vec![CellValue::Float(1.0), CellValue::Float(2.0)]),
            ("b".to_string(), vec![CellValue::Float(3.0), CellValue::Float(4.0)]),
        ])
        .unwrap();
        assert_eq!(table.rows()[1], vec![CellValue::Float(2.0), CellValue::Float(4.0)]);

        let ragged = FeatureTable::from_columns(vec![
            ("a".to_string(), vec![CellValue::Float(1.0)]),
            ("b".to_string(), vec![]),
        ]);
        assert!(ragged.is_err());

        let mut first = BTreeMap::new();
        first.insert("x".to_string(), CellValue::Int(1));
        let mut second = BTreeMap::new();
        second.insert("y".to_string(), CellValue::Int(2));
        let records = FeatureTable::from_records(vec![first, second]);
        assert_eq!(records.columns(), &cols(&["x", "y"])[..]);
        assert_eq!(records.rows()[1], vec![CellValue::Missing, CellValue::Int(2)]);
    }

    #[test]
    fn test_push_row_checks_width() {
        let mut table = FeatureTable::new(cols(&["a"]));
        assert!(table.push_row(vec![CellValue::Int(1), CellValue::Int(2)]).is_err());
    }
}
