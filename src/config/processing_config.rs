// src/config/processing_config.rs
//! Signal processing configuration structures

use serde::{Deserialize, Serialize};

use crate::config::constants::{processing, thresholds};

/// Fixed processing parameters applied to every region
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ProcessingConfig {
    #[serde(default = "defaults::sampling_rate_hz")]
    pub sampling_rate_hz: f64,

    #[serde(default = "defaults::lowpass_cutoff_hz")]
    pub lowpass_cutoff_hz: f64,

    #[serde(default)]
    pub time_window: TimeWindow,

    #[serde(default)]
    pub band: FrequencyBand,

    #[serde(default)]
    pub thresholds: ThresholdConfig,
}

/// Closed-open time window `[start, end)` in seconds
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    pub start: f64,
    pub end: f64,
}

impl TimeWindow {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// `start` is included, `end` is excluded
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t < self.end
    }
}

/// Frequency band of interest in Hz
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct FrequencyBand {
    pub low_hz: f64,
    pub high_hz: f64,
}

impl FrequencyBand {
    pub fn new(low_hz: f64, high_hz: f64) -> Self {
        Self { low_hz, high_hz }
    }
}

/// Cycle-detection thresholds used for burst classification
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ThresholdConfig {
    pub amp_fraction_threshold: f64,
    pub amp_consistency_threshold: f64,
    pub period_consistency_threshold: f64,
    pub monotonicity_threshold: f64,
    pub min_n_cycles: usize,
}

mod defaults {
    use super::processing;

    pub fn sampling_rate_hz() -> f64 { processing::DEFAULT_SAMPLING_RATE_HZ }
    pub fn lowpass_cutoff_hz() -> f64 { processing::DEFAULT_LOWPASS_CUTOFF_HZ }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            sampling_rate_hz: defaults::sampling_rate_hz(),
            lowpass_cutoff_hz: defaults::lowpass_cutoff_hz(),
            time_window: TimeWindow::default(),
            band: FrequencyBand::default(),
            thresholds: ThresholdConfig::default(),
        }
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self::new(processing::DEFAULT_WINDOW_START_S, processing::DEFAULT_WINDOW_END_S)
    }
}

impl Default for FrequencyBand {
    fn default() -> Self {
        let (low_hz, high_hz) = processing::DEFAULT_BAND_HZ;
        Self::new(low_hz, high_hz)
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            amp_fraction_threshold: thresholds::AMP_FRACTION,
            amp_consistency_threshold: thresholds::AMP_CONSISTENCY,
            period_consistency_threshold: thresholds::PERIOD_CONSISTENCY,
            monotonicity_threshold: thresholds::MONOTONICITY,
            min_n_cycles: thresholds::MIN_N_CYCLES,
        }
    }
}

/// Validate processing configuration
pub fn validate_processing_config(config: &ProcessingConfig) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();
    let nyquist = config.sampling_rate_hz / 2.0;

    if !(config.sampling_rate_hz > 0.0) {
        errors.push("Sampling rate must be positive".to_string());
    }

    if !(config.lowpass_cutoff_hz > 0.0) || config.lowpass_cutoff_hz >= nyquist {
        errors.push(format!(
            "Lowpass cutoff ({} Hz) must be positive and below Nyquist ({} Hz)",
            config.lowpass_cutoff_hz, nyquist
        ));
    }

    if !(config.band.low_hz > 0.0) || config.band.low_hz >= config.band.high_hz {
        errors.push(format!(
            "Band ({}, {}) Hz must be positive and ordered",
            config.band.low_hz, config.band.high_hz
        ));
    }
    if config.band.high_hz >= nyquist {
        errors.push(format!(
            "Band upper edge ({} Hz) must be below Nyquist ({} Hz)",
            config.band.high_hz, nyquist
        ));
    }

    if !(config.time_window.start < config.time_window.end) {
        errors.push(format!(
            "Time window start ({}) must precede end ({})",
            config.time_window.start, config.time_window.end
        ));
    }

    let t = &config.thresholds;
    for (name, value) in [
        ("amp_fraction_threshold", t.amp_fraction_threshold),
        ("amp_consistency_threshold", t.amp_consistency_threshold),
        ("period_consistency_threshold", t.period_consistency_threshold),
        ("monotonicity_threshold", t.monotonicity_threshold),
    ] {
        if !(0.0..=1.0).contains(&value) {
            errors.push(format!("{} must be between 0 and 1, got {}", name, value));
        }
    }
    if t.min_n_cycles == 0 {
        errors.push("min_n_cycles must be at least 1".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ProcessingConfig::default();
        assert!(validate_processing_config(&config).is_ok());
        assert_eq!(config.sampling_rate_hz, 400.0);
        assert_eq!(config.band, FrequencyBand::new(3.0, 7.0));
        assert_eq!(config.thresholds.min_n_cycles, 3);
    }

    #[test]
    fn test_window_is_closed_open() {
        let window = TimeWindow::new(-0.3, 2.8);
        assert!(window.contains(-0.3));
        assert!(window.contains(2.7999));
        assert!(!window.contains(2.8));
        assert!(!window.contains(-0.30001));
        assert!(!window.contains(f64::NAN));
    }

    #[test]
    fn test_invalid_filter_config() {
        let mut config = ProcessingConfig::default();
        config.lowpass_cutoff_hz = 250.0;
        assert!(validate_processing_config(&config).is_err());

        let mut config = ProcessingConfig::default();
        config.band = FrequencyBand::new(7.0, 3.0);
        assert!(validate_processing_config(&config).is_err());
    }

    #[test]
    fn test_invalid_thresholds() {
        let mut config = ProcessingConfig::default();
        config.thresholds.monotonicity_threshold = 1.5;
        config.thresholds.min_n_cycles = 0;
        let errors = validate_processing_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_config_serialization() {
        let config = ProcessingConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: ProcessingConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config, deserialized);
    }
}
