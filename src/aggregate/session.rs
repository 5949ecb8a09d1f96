// src/aggregate/session.rs
//! Session merge and retention
//!
//! All region CSVs beneath a session directory are concatenated into one
//! timestamped merged artifact (header from the first file only). The merge
//! file is written to a temporary file in the session directory and renamed
//! into place, then validated. Afterwards only the merged artifact with the
//! newest embedded timestamp is kept.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tempfile::NamedTempFile;
use walkdir::WalkDir;

use super::naming::{is_merged_csv, is_region_csv, merged_csv_name, parse_merged_timestamp};
use super::validate::{validate_csv, CsvSummary};
use super::AggregateError;
use crate::config::constants::validation::{MIN_DATA_ROWS, REQUIRED_COLUMNS};
use crate::report::{Reporter, Scope};
use crate::utils::Clock;

/// Outcome of merging one session
#[derive(Debug)]
pub struct MergeReport {
    pub merged_path: PathBuf,
    pub sources: Vec<PathBuf>,
    pub rows_written: usize,
    pub validation: Result<CsvSummary, AggregateError>,
    pub retention: RetentionReport,
}

impl MergeReport {
    pub fn is_valid(&self) -> bool {
        self.validation.is_ok()
    }
}

/// Which merged artifacts survived retention
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RetentionReport {
    pub kept: Option<PathBuf>,
    pub deleted: Vec<PathBuf>,
    /// Stale artifacts that could not be deleted
    pub failed: Vec<PathBuf>,
}

/// Region CSVs beneath `session_dir`, recursively, in lexicographic path order
///
/// Merged artifacts live directly in `session_dir` and are excluded there only.
pub fn discover_region_csvs(session_dir: &Path, session_id: &str, tag: &str) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = WalkDir::new(session_dir)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            let name = entry.file_name().to_string_lossy();
            is_region_csv(&name, tag) && !(entry.depth() == 1 && is_merged_csv(&name, session_id, tag))
        })
        .map(|entry| entry.into_path())
        .collect();
    found.sort();
    found
}

/// Merge, validate, and apply retention for one session
///
/// Returns `Ok(None)` when there is nothing to merge.
pub fn merge_session_csv(
    session_dir: &Path,
    session_id: &str,
    tag: &str,
    clock: &dyn Clock,
    reporter: &dyn Reporter,
    scope: &Scope,
) -> Result<Option<MergeReport>, AggregateError> {
    let sources = discover_region_csvs(session_dir, session_id, tag);
    reporter.debug(scope, format!("Found {} region CSV files for merging", sources.len()));
    if sources.is_empty() {
        reporter.warn(scope, "No region CSV files found, merged CSV not created".to_string());
        return Ok(None);
    }

    let merged_path = session_dir.join(merged_csv_name(session_id, tag, &clock.timestamp()));
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| AggregateError::Io { path, source }
    };

    let mut temp = NamedTempFile::new_in(session_dir).map_err(io_err(session_dir))?;
    let rows_written = {
        let mut out = BufWriter::new(temp.as_file_mut());
        let rows = concatenate(&sources, &mut out, reporter, scope).map_err(io_err(&merged_path))?;
        out.flush().map_err(io_err(&merged_path))?;
        rows
    };
    temp.persist(&merged_path).map_err(|err| AggregateError::Io {
        path: merged_path.clone(),
        source: err.error,
    })?;
    reporter.info(scope, format!("Merged CSV file created: {}", merged_path.display()));

    let validation = validate_csv(&merged_path, &REQUIRED_COLUMNS, MIN_DATA_ROWS);
    match &validation {
        Ok(summary) => reporter.info(scope, format!("Merged CSV validation passed: {} rows", summary.rows)),
        Err(err) => reporter.error(scope, format!("Merged CSV validation failed: {}", err)),
    }

    let retention = retain_latest_merged(session_dir, session_id, tag, reporter, scope)?;

    Ok(Some(MergeReport {
        merged_path,
        sources,
        rows_written,
        validation,
        retention,
    }))
}

/// Copy the first header line and every data line; returns data lines written
fn concatenate<W: Write>(
    sources: &[PathBuf],
    out: &mut W,
    reporter: &dyn Reporter,
    scope: &Scope,
) -> std::io::Result<usize> {
    let mut header_written = false;
    let mut rows = 0;
    let mut line = Vec::new();

    for source in sources {
        let file = match File::open(source) {
            Ok(file) => file,
            Err(err) => {
                reporter.error(scope, format!("Failed to read {}: {}", source.display(), err));
                continue;
            }
        };
        let mut reader = BufReader::new(file);
        let mut index = 0usize;

        loop {
            line.clear();
            match reader.read_until(b'\n', &mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(err) => {
                    reporter.error(scope, format!("Failed to read {}: {}", source.display(), err));
                    break;
                }
            }

            let is_header = index == 0;
            index += 1;
            if is_header {
                if header_written {
                    continue;
                }
                header_written = true;
            } else {
                rows += 1;
            }

            out.write_all(&line)?;
            if !line.ends_with(b"\n") {
                out.write_all(b"\n")?;
            }
        }
        reporter.debug(scope, format!("Merged {}", source.display()));
    }

    Ok(rows)
}

/// Keep only the merged artifact with the newest parsed timestamp
///
/// Names that do not follow the convention are ignored. Equal timestamps are
/// ordered by name.
pub fn retain_latest_merged(
    session_dir: &Path,
    session_id: &str,
    tag: &str,
    reporter: &dyn Reporter,
    scope: &Scope,
) -> Result<RetentionReport, AggregateError> {
    let entries = fs::read_dir(session_dir).map_err(|source| AggregateError::Io {
        path: session_dir.to_path_buf(),
        source,
    })?;

    let mut merged: Vec<(NaiveDateTime, PathBuf)> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            parse_merged_timestamp(&name, session_id, tag).map(|ts| (ts, entry.path()))
        })
        .collect();
    reporter.debug(scope, format!("Found {} merged CSV files", merged.len()));

    merged.sort_by(|a, b| b.cmp(a));

    let mut report = RetentionReport::default();
    let mut candidates = merged.into_iter().map(|(_, path)| path);
    report.kept = candidates.next();

    for stale in candidates {
        match fs::remove_file(&stale) {
            Ok(()) => {
                reporter.info(scope, format!("Deleted older merged CSV file: {}", stale.display()));
                report.deleted.push(stale);
            }
            Err(err) => {
                reporter.error(scope, format!("Failed to delete {}: {}", stale.display(), err));
                report.failed.push(stale);
            }
        }
    }
    if report.deleted.is_empty() && report.failed.is_empty() {
        reporter.debug(scope, "No older merged CSV files to delete".to_string());
    }

    Ok(report)
}
