// src/aggregate/region.rs
//! Region CSV writer
//!
//! Annotated feature tables of one region are appended to a single CSV in
//! enumeration order. The header comes from the first non-empty table and is
//! written exactly once. Later tables are lined up with that header by column
//! name: absent columns become empty cells and columns the header lacks are
//! dropped with a warning. The file is validated after writing and kept
//! either way.

use std::path::{Path, PathBuf};

use csv::{Terminator, WriterBuilder};

use super::validate::{validate_csv, CsvSummary};
use super::AggregateError;
use crate::config::constants::validation::{MIN_DATA_ROWS, REQUIRED_COLUMNS};
use crate::processing::driver::PairFeatures;
use crate::report::{Reporter, Scope};

/// Outcome of writing one region CSV
#[derive(Debug)]
pub struct RegionWriteReport {
    pub path: PathBuf,
    pub tables_written: usize,
    pub rows_written: usize,
    pub tables_skipped: usize,
    pub validation: Result<CsvSummary, AggregateError>,
}

impl RegionWriteReport {
    pub fn is_valid(&self) -> bool {
        self.validation.is_ok()
    }
}

/// Write every non-empty table of `pairs` to `path`
///
/// Only failing to create or write the file is an error.
pub fn write_region_csv(
    path: &Path,
    pairs: &[PairFeatures],
    labels: &[String],
    reporter: &dyn Reporter,
    scope: &Scope,
) -> Result<RegionWriteReport, AggregateError> {
    let csv_err = |source: csv::Error| AggregateError::Csv {
        path: path.to_path_buf(),
        source,
    };

    reporter.debug(scope, format!("Writing region CSV {}", path.display()));
    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_path(path)
        .map_err(csv_err)?;

    let mut header: Option<Vec<String>> = None;
    let mut tables_written = 0;
    let mut rows_written = 0;
    let mut tables_skipped = 0;

    for (index, pair) in pairs.iter().enumerate() {
        let pair_scope = scope.with_trial(pair.trial).with_channel(pair.channel);

        let Some(table) = pair.table.as_ref().filter(|t| !t.is_empty()) else {
            reporter.warn(&pair_scope, format!("No data for table {}", index));
            tables_skipped += 1;
            continue;
        };
        let Some(label) = labels.get(pair.channel) else {
            reporter.warn(
                &pair_scope,
                format!("No label for channel {}, skipping table {}", pair.channel, index),
            );
            tables_skipped += 1;
            continue;
        };

        let annotated = table.annotate(pair.trial, pair.channel, label);
        if header.is_none() {
            writer.write_record(annotated.columns()).map_err(csv_err)?;
        }
        let columns: &[String] = header.get_or_insert_with(|| annotated.columns().to_vec());

        let extra: Vec<&str> = annotated
            .columns()
            .iter()
            .filter(|c| !columns.contains(c))
            .map(String::as_str)
            .collect();
        if !extra.is_empty() {
            reporter.warn(
                &pair_scope,
                format!("Dropping columns of table {} not in the header: {:?}", index, extra),
            );
        }

        let positions: Vec<Option<usize>> = columns.iter().map(|c| annotated.column_index(c)).collect();
        for row in annotated.rows() {
            let cells = positions
                .iter()
                .map(|position| position.map_or_else(String::new, |i| row[i].to_string()));
            writer.write_record(cells).map_err(csv_err)?;
        }
        tables_written += 1;
        rows_written += annotated.n_rows();
        reporter.debug(&pair_scope, format!("Appended {} rows", annotated.n_rows()));
    }

    writer.flush().map_err(|source| AggregateError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    drop(writer);
    reporter.info(scope, format!("Region CSV created: {}", path.display()));

    let validation = validate_csv(path, &REQUIRED_COLUMNS, MIN_DATA_ROWS);
    match &validation {
        Ok(summary) => reporter.info(scope, format!("Validation passed: {} rows", summary.rows)),
        Err(err) => reporter.error(scope, format!("Validation failed: {}", err)),
    }

    Ok(RegionWriteReport {
        path: path.to_path_buf(),
        tables_written,
        rows_written,
        tables_skipped,
        validation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::processing::features::{CellValue, FeatureTable};
    use crate::report::{Level, MemoryReporter};
    use tempfile::tempdir;

    fn table(values: &[i64]) -> FeatureTable {
        FeatureTable::from_rows(
            vec!["period".to_string(), "is_burst".to_string()],
            values.iter().map(|&v| vec![CellValue::Int(v), CellValue::Bool(v > 60)]).collect(),
        )
        .unwrap()
    }

    fn pair(trial: usize, channel: usize, table: Option<FeatureTable>) -> PairFeatures {
        PairFeatures { trial, channel, table }
    }

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_single_header_and_annotations() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("P01_HPC_bycycle_features_20240101_120000.csv");
        let reporter = MemoryReporter::new();

        let pairs = vec![
            pair(0, 0, None),
            pair(0, 1, Some(table(&[66, 50]))),
            pair(1, 0, Some(FeatureTable::new(vec!["period".to_string()]))),
            pair(1, 1, Some(table(&[67]))),
        ];
        let report = write_region_csv(&path, &pairs, &labels(&["CA1", "CA3"]), &reporter, &Scope::root()).unwrap();

        assert!(report.is_valid());
        assert_eq!(report.tables_written, 2);
        assert_eq!(report.tables_skipped, 2);
        assert_eq!(report.rows_written, 3);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "trial,channel_idx,channel_label,period,is_burst\n\
             0,1,CA3,66,True\n\
             0,1,CA3,50,False\n\
             1,1,CA3,67,True\n"
        );
        assert_eq!(reporter.find(Level::Warn, "No data").len(), 2);
    }

    #[test]
    fn test_all_empty_keeps_invalid_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("region.csv");
        let reporter = MemoryReporter::new();

        let report = write_region_csv(&path, &[pair(0, 0, None)], &labels(&["CA1"]), &reporter, &Scope::root()).unwrap();

        assert!(!report.is_valid());
        assert!(path.exists());
        assert_eq!(reporter.count(Level::Error), 1);
    }

    #[test]
    fn test_unlabeled_channel_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("region.csv");
        let reporter = MemoryReporter::new();

        let pairs = vec![pair(0, 0, Some(table(&[66]))), pair(0, 1, Some(table(&[70])))];
        let report = write_region_csv(&path, &pairs, &labels(&["CA1"]), &reporter, &Scope::root()).unwrap();

        assert_eq!(report.tables_written, 1);
        assert_eq!(reporter.find(Level::Warn, "No label for channel 1").len(), 1);
    }

    #[test]
    fn test_differing_columns_aligned_by_name() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("region.csv");
        let reporter = MemoryReporter::new();

        let record = |pairs: &[(&str, CellValue)]| -> BTreeMap<String, CellValue> {
            pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
        };
        let first = FeatureTable::from_records(vec![record(&[
            ("period", CellValue::Int(66)),
            ("volt_amp", CellValue::Float(1.5)),
        ])]);
        let second = FeatureTable::from_records(vec![record(&[("period", CellValue::Int(70))])]);
        let third = FeatureTable::from_records(vec![record(&[
            ("volt_amp", CellValue::Float(2.5)),
            ("band_amp", CellValue::Float(9.0)),
        ])]);

        let pairs = vec![pair(0, 0, Some(first)), pair(0, 1, Some(second)), pair(1, 0, Some(third))];
        let report = write_region_csv(&path, &pairs, &labels(&["a", "b"]), &reporter, &Scope::root()).unwrap();

        assert_eq!(report.tables_written, 3);
        assert_eq!(report.tables_skipped, 0);
        assert_eq!(report.rows_written, 3);
        assert!(report.is_valid());

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "trial,channel_idx,channel_label,period,volt_amp\n\
             0,0,a,66,1.5\n\
             0,1,b,70,\n\
             1,0,a,,2.5\n"
        );
        let warnings = reporter.find(Level::Warn, "not in the header");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("band_amp"));
    }
}
