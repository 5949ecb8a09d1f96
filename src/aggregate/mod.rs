// src/aggregate/mod.rs
//! CSV artifacts
//!
//! Region tables are written under `<csv_root>/<session>/<region>/`, then
//! every region file of a session is merged into one artifact in
//! `<csv_root>/<session>/`. Only the newest merged artifact is retained.

pub mod naming;
pub mod region;
pub mod session;
pub mod validate;

use std::path::PathBuf;

use thiserror::Error;

pub use naming::{is_merged_csv, is_region_csv, merged_csv_name, parse_merged_timestamp, region_csv_name};
pub use region::{write_region_csv, RegionWriteReport};
pub use session::{discover_region_csvs, merge_session_csv, retain_latest_merged, MergeReport, RetentionReport};
pub use validate::{validate_csv, CsvSummary};

/// Artifact write and validation errors
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Validation failed for {}: {reason}", .path.display())]
    Validation { path: PathBuf, reason: String },
}
