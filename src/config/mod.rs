// src/config/mod.rs
//! Layered configuration for the feature pipeline
//!
//! Processing parameters are fixed per run and deliberately not exposed as
//! command-line flags; they come from compiled-in defaults, optional TOML
//! files, and `BYCYCLE__` environment overrides (see [`ConfigLoader`]).

pub mod constants;
pub mod loader;
pub mod processing_config;

pub use constants::*;
pub use loader::{ConfigError, ConfigLoader};
pub use processing_config::*;

use serde::{Deserialize, Serialize};

/// Complete pipeline configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct PipelineConfig {
    #[serde(default)]
    pub processing: ProcessingConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
}

/// Container keys and artifact naming conventions
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LayoutConfig {
    #[serde(default = "defaults::data_group")]
    pub data_group: String,

    #[serde(default = "defaults::labels_suffix")]
    pub labels_suffix: String,

    #[serde(default = "defaults::signal_suffix")]
    pub signal_suffix: String,

    #[serde(default = "defaults::time_key")]
    pub time_key: String,

    #[serde(default = "defaults::input_suffix")]
    pub input_suffix: String,

    #[serde(default = "defaults::feature_tag")]
    pub feature_tag: String,
}

/// Default value providers using constants
mod defaults {
    use crate::config::constants::layout;

    pub fn data_group() -> String { layout::DATA_GROUP.to_string() }
    pub fn labels_suffix() -> String { layout::LABELS_SUFFIX.to_string() }
    pub fn signal_suffix() -> String { layout::SIGNAL_SUFFIX.to_string() }
    pub fn time_key() -> String { layout::TIME_KEY.to_string() }
    pub fn input_suffix() -> String { layout::INPUT_SUFFIX.to_string() }
    pub fn feature_tag() -> String { layout::FEATURE_TAG.to_string() }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            data_group: defaults::data_group(),
            labels_suffix: defaults::labels_suffix(),
            signal_suffix: defaults::signal_suffix(),
            time_key: defaults::time_key(),
            input_suffix: defaults::input_suffix(),
            feature_tag: defaults::feature_tag(),
        }
    }
}

impl LayoutConfig {
    /// `<region>_labels`
    pub fn labels_key(&self, region: &str) -> String {
        format!("{}{}", region, self.labels_suffix)
    }

    /// `<region>_selectedChanSpkRmvl`
    pub fn signal_key(&self, region: &str) -> String {
        format!("{}{}", region, self.signal_suffix)
    }
}

impl PipelineConfig {
    /// Validate configuration consistency
    pub fn validate_consistency(&self) -> Result<(), Vec<String>> {
        let mut errors = match validate_processing_config(&self.processing) {
            Ok(()) => Vec::new(),
            Err(errors) => errors,
        };

        let layout = &self.layout;
        for (name, value) in [
            ("data_group", &layout.data_group),
            ("time_key", &layout.time_key),
            ("input_suffix", &layout.input_suffix),
            ("feature_tag", &layout.feature_tag),
        ] {
            if value.trim().is_empty() {
                errors.push(format!("layout.{} must not be empty", name));
            }
        }
        if layout.labels_suffix == layout.signal_suffix {
            errors.push("layout.labels_suffix and layout.signal_suffix must differ".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Get configuration summary
    pub fn get_summary(&self) -> ConfigSummary {
        let p = &self.processing;
        ConfigSummary {
            sampling_rate_hz: p.sampling_rate_hz,
            time_window: (p.time_window.start, p.time_window.end),
            band_hz: (p.band.low_hz, p.band.high_hz),
            lowpass_cutoff_hz: p.lowpass_cutoff_hz,
            min_n_cycles: p.thresholds.min_n_cycles,
        }
    }
}

/// Configuration summary for display/logging
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSummary {
    pub sampling_rate_hz: f64,
    pub time_window: (f64, f64),
    pub band_hz: (f64, f64),
    pub lowpass_cutoff_hz: f64,
    pub min_n_cycles: usize,
}
