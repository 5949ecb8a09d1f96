// src/aggregate/naming.rs
//! Artifact file names
//!
//! - Region: `<session>_<region>_<tag>_<YYYYMMDD_HHMMSS>.csv`
//! - Merged: `<session>_merged_<tag>_<YYYYMMDD_HHMMSS>.csv`

use chrono::NaiveDateTime;

use crate::config::constants::layout::{CSV_EXTENSION, MERGED_TAG};
use crate::utils::parse_timestamp;

pub fn region_csv_name(session_id: &str, region: &str, tag: &str, timestamp: &str) -> String {
    format!("{}_{}_{}_{}.{}", session_id, region, tag, timestamp, CSV_EXTENSION)
}

pub fn merged_csv_name(session_id: &str, tag: &str, timestamp: &str) -> String {
    format!("{}{}.{}", merged_prefix(session_id, tag), timestamp, CSV_EXTENSION)
}

fn merged_prefix(session_id: &str, tag: &str) -> String {
    format!("{}_{}_{}_", session_id, MERGED_TAG, tag)
}

/// Timestamp embedded in a merged artifact name, if the name follows the convention
pub fn parse_merged_timestamp(file_name: &str, session_id: &str, tag: &str) -> Option<NaiveDateTime> {
    let stamp = file_name
        .strip_prefix(&merged_prefix(session_id, tag))?
        .strip_suffix(CSV_EXTENSION)?
        .strip_suffix('.')?;
    parse_timestamp(stamp)
}

/// Region artifacts carry `_<tag>_` and the CSV extension
pub fn is_region_csv(file_name: &str, tag: &str) -> bool {
    has_csv_extension(file_name) && file_name.contains(&format!("_{}_", tag))
}

/// Merged artifacts of `session_id` start with `<session>_merged_<tag>_`
pub fn is_merged_csv(file_name: &str, session_id: &str, tag: &str) -> bool {
    has_csv_extension(file_name) && file_name.starts_with(&merged_prefix(session_id, tag))
}

fn has_csv_extension(file_name: &str) -> bool {
    file_name
        .rsplit_once('.')
        .is_some_and(|(_, extension)| extension == CSV_EXTENSION)
}
