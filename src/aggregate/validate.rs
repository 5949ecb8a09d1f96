// src/aggregate/validate.rs
//! Read-back validation of written artifacts

use std::path::Path;

use super::AggregateError;

/// What a valid artifact contains
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvSummary {
    pub columns: Vec<String>,
    pub rows: usize,
}

/// Check that `path` parses as CSV, carries `required` columns and has at least `min_rows` data rows
pub fn validate_csv(path: &Path, required: &[&str], min_rows: usize) -> Result<CsvSummary, AggregateError> {
    let csv_err = |source: csv::Error| AggregateError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let invalid = |reason: String| AggregateError::Validation {
        path: path.to_path_buf(),
        reason,
    };

    let mut reader = csv::Reader::from_path(path).map_err(csv_err)?;
    let columns: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(str::to_string)
        .collect();

    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|column| !columns.iter().any(|c| c.as_str() == *column))
        .collect();
    if !missing.is_empty() {
        return Err(invalid(format!("missing columns {:?}", missing)));
    }

    let mut rows = 0;
    for record in reader.records() {
        record.map_err(csv_err)?;
        rows += 1;
    }
    if rows < min_rows {
        return Err(invalid(format!("expected at least {} rows, found {}", min_rows, rows)));
    }

    Ok(CsvSummary { columns, rows })
}
