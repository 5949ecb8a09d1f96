// src/processing/features/mod.rs
//! Cycle feature extraction
//!
//! This module provides per-cycle feature extraction for LFP signals:
//! - The [`CycleFeatureExtractor`] seam the driver calls for every (trial, channel) pair
//! - [`FeatureTable`], the tabular form written to CSV
//! - [`BycycleExtractor`], peak-centered shape and burst features
//! - An FFT Hilbert transform for band amplitude

pub mod bycycle;
pub mod hilbert;
pub mod table;

use std::collections::BTreeMap;

use thiserror::Error;

use crate::config::{FrequencyBand, ThresholdConfig};
use crate::processing::filters::FilterError;

pub use bycycle::{BycycleExtractor, FEATURE_COLUMNS};
pub use table::{CellValue, FeatureTable};

/// Feature extraction errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),

    #[error("Cycle extraction failed: {0}")]
    Extraction(String),

    #[error("Channel {channel} out of range for a trial with {available} channels")]
    ChannelOutOfRange { channel: usize, available: usize },

    #[error("Malformed extractor output: {0}")]
    MalformedOutput(String),
}

/// What an extractor may hand back; every shape is coerced into a table
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractorOutput {
    Table(FeatureTable),
    /// One keyed record per cycle
    Records(Vec<BTreeMap<String, CellValue>>),
    /// Named columns of equal length
    Columns(Vec<(String, Vec<CellValue>)>),
}

impl ExtractorOutput {
    pub fn into_table(self) -> Result<FeatureTable, FeatureError> {
        match self {
            ExtractorOutput::Table(table) => Ok(table),
            ExtractorOutput::Records(records) => Ok(FeatureTable::from_records(records)),
            ExtractorOutput::Columns(columns) => FeatureTable::from_columns(columns),
        }
    }
}

/// Cycle-by-cycle feature extraction over one channel of one trial
pub trait CycleFeatureExtractor: Send + Sync {
    fn extract(
        &self,
        signal: &[f64],
        sampling_rate_hz: f64,
        band: FrequencyBand,
        thresholds: &ThresholdConfig,
    ) -> Result<ExtractorOutput, FeatureError>;
}

impl<F> CycleFeatureExtractor for F
where
    F: Fn(&[f64], f64, FrequencyBand, &ThresholdConfig) -> Result<ExtractorOutput, FeatureError> + Send + Sync,
{
    fn extract(
        &self,
        signal: &[f64],
        sampling_rate_hz: f64,
        band: FrequencyBand,
        thresholds: &ThresholdConfig,
    ) -> Result<ExtractorOutput, FeatureError> {
        self(signal, sampling_rate_hz, band, thresholds)
    }
}
