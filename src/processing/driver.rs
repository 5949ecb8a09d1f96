// src/processing/driver.rs
//! Feature extraction over every (trial, channel) pair of a region

use crate::config::{FrequencyBand, ProcessingConfig, ThresholdConfig};
use crate::processing::features::{CycleFeatureExtractor, FeatureError, FeatureTable};
use crate::processing::filters::{PassType, SignalFilter};
use crate::report::{Reporter, Scope};
use crate::trials::Trial;

/// Parameters shared by every pair
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionParams {
    pub sampling_rate_hz: f64,
    pub lowpass_cutoff_hz: f64,
    pub band: FrequencyBand,
    pub thresholds: ThresholdConfig,
}

impl ExtractionParams {
    pub fn from_config(config: &ProcessingConfig) -> Self {
        Self {
            sampling_rate_hz: config.sampling_rate_hz,
            lowpass_cutoff_hz: config.lowpass_cutoff_hz,
            band: config.band,
            thresholds: config.thresholds.clone(),
        }
    }
}

impl Default for ExtractionParams {
    fn default() -> Self {
        Self::from_config(&ProcessingConfig::default())
    }
}

/// Result for one pair; `table` is `None` when extraction failed
#[derive(Debug, Clone, PartialEq)]
pub struct PairFeatures {
    /// Position among the surviving trials
    pub trial: usize,
    pub channel: usize,
    pub table: Option<FeatureTable>,
}

/// Lowpass one channel and run the cycle extractor on it
pub fn extract_pair(
    trial: &Trial,
    channel: usize,
    params: &ExtractionParams,
    filter: &dyn SignalFilter,
    extractor: &dyn CycleFeatureExtractor,
) -> Result<FeatureTable, FeatureError> {
    let signal = trial.channel(channel).ok_or(FeatureError::ChannelOutOfRange {
        channel,
        available: trial.n_channels(),
    })?;

    let lowpassed = filter.filter(
        &signal,
        params.sampling_rate_hz,
        PassType::Lowpass {
            cutoff_hz: params.lowpass_cutoff_hz,
        },
    )?;

    extractor
        .extract(&lowpassed, params.sampling_rate_hz, params.band, &params.thresholds)?
        .into_table()
}

/// Enumerate trials × channels in order, tolerating per-pair failures
///
/// The output always has `trials.len() * channel_count` entries, trial-major.
pub fn extract_region_features(
    trials: &[Trial],
    channel_count: usize,
    params: &ExtractionParams,
    filter: &dyn SignalFilter,
    extractor: &dyn CycleFeatureExtractor,
    reporter: &dyn Reporter,
    scope: &Scope,
) -> Vec<PairFeatures> {
    reporter.debug(
        scope,
        format!(
            "Extracting features for {} trial-channel combinations",
            trials.len() * channel_count
        ),
    );

    let mut results = Vec::with_capacity(trials.len() * channel_count);
    for (position, trial) in trials.iter().enumerate() {
        for channel in 0..channel_count {
            let pair_scope = scope.with_trial(position).with_channel(channel);
            let table = match extract_pair(trial, channel, params, filter, extractor) {
                Ok(table) => {
                    reporter.debug(&pair_scope, format!("{} cycles extracted", table.n_rows()));
                    Some(table)
                }
                Err(err) => {
                    reporter.error(
                        &pair_scope,
                        format!(
                            "Feature extraction failed (source trial {}): {}",
                            trial.source_index, err
                        ),
                    );
                    None
                }
            };
            results.push(PairFeatures {
                trial: position,
                channel,
                table,
            });
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::features::{CellValue, ExtractorOutput};
    use crate::processing::filters::{FilterError, FirFilter};
    use crate::report::{Level, MemoryReporter};
    use ndarray::{Array1, Array2};

    fn trial(source_index: usize, samples: usize, channels: usize) -> Trial {
        Trial {
            source_index,
            signal: Array2::from_shape_fn((samples, channels), |(i, c)| (i as f64 * 0.1).sin() + c as f64),
            time: Array1::from_shape_fn(samples, |i| i as f64 / 400.0),
        }
    }

    /// Passthrough filter, so extractors see the raw channel
    struct Identity;

    impl SignalFilter for Identity {
        fn filter(&self, signal: &[f64], _fs: f64, _pass: PassType) -> Result<Vec<f64>, FilterError> {
            Ok(signal.to_vec())
        }
    }

    fn first_sample(signal: &[f64], _fs: f64, _band: FrequencyBand, _t: &ThresholdConfig) -> Result<ExtractorOutput, FeatureError> {
        let mut table = FeatureTable::new(vec!["first".to_string()]);
        table.push_row(vec![CellValue::Float(signal[0])])?;
        Ok(ExtractorOutput::Table(table))
    }

    #[test]
    fn test_full_cross_product_in_order() {
        let trials = vec![trial(0, 50, 3), trial(2, 50, 3)];
        let reporter = MemoryReporter::new();

        let results = extract_region_features(
            &trials,
            3,
            &ExtractionParams::default(),
            &Identity,
            &first_sample,
            &reporter,
            &Scope::root(),
        );

        let pairs: Vec<(usize, usize)> = results.iter().map(|r| (r.trial, r.channel)).collect();
        assert_eq!(pairs, vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2)]);
        assert!(results.iter().all(|r| r.table.is_some()));
        assert_eq!(results[4].table.as_ref().unwrap().rows()[0][0], CellValue::Float(1.0));
    }

    #[test]
    fn test_channel_out_of_range_yields_none() {
        // Second trial has fewer channels than the first
        let trials = vec![trial(0, 50, 2), trial(1, 50, 1)];
        let reporter = MemoryReporter::new();

        let results = extract_region_features(
            &trials,
            2,
            &ExtractionParams::default(),
            &Identity,
            &first_sample,
            &reporter,
            &Scope::session("P01").with_region("HPC"),
        );

        assert_eq!(results.len(), 4);
        assert!(results[3].table.is_none());
        let errors = reporter.find(Level::Error, "out of range");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].scope.trial, Some(1));
        assert_eq!(errors[0].scope.channel, Some(1));
    }

    #[test]
    fn test_filter_failure_is_per_pair() {
        // 41-tap lowpass on a 20-sample trial fails
        let trials = vec![trial(0, 20, 2)];
        let reporter = MemoryReporter::new();

        let results = extract_region_features(
            &trials,
            2,
            &ExtractionParams::default(),
            &FirFilter::default(),
            &first_sample,
            &reporter,
            &Scope::root(),
        );

        assert!(results.iter().all(|r| r.table.is_none()));
        assert_eq!(reporter.count(Level::Error), 2);
    }
}
