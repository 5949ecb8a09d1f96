// src/processing/features/bycycle.rs
//! Cycle-by-cycle waveform features
//!
//! Cycles are peak-centered: each spans from the trough before a peak to the
//! trough after it. Extrema are located between zero crossings of a
//! narrowband copy of the signal, while all shape measurements are taken on
//! the signal itself. Sample-based quantities are in samples, voltages in the
//! units of the input.

use super::hilbert::analytic_amplitude;
use super::table::{CellValue, FeatureTable};
use super::{CycleFeatureExtractor, ExtractorOutput, FeatureError};
use crate::config::{FrequencyBand, ThresholdConfig};
use crate::processing::filters::{FirFilter, PassType, SignalFilter};

/// Output columns, in order
pub const FEATURE_COLUMNS: [&str; 23] = [
    "period",
    "time_peak",
    "time_trough",
    "volt_peak",
    "volt_trough",
    "time_decay",
    "time_rise",
    "volt_decay",
    "volt_rise",
    "volt_amp",
    "time_rdsym",
    "time_ptsym",
    "band_amp",
    "sample_peak",
    "sample_zerox_decay",
    "sample_zerox_rise",
    "sample_last_trough",
    "sample_next_trough",
    "amp_fraction",
    "amp_consistency",
    "period_consistency",
    "monotonicity",
    "is_burst",
];

/// Sample positions of one peak-centered cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cycle {
    pub last_trough: usize,
    pub peak: usize,
    pub next_trough: usize,
    pub zerox_rise: usize,
    pub zerox_decay: usize,
}

/// Default extractor: bycycle-style shape and burst features
#[derive(Debug, Clone, Copy, Default)]
pub struct BycycleExtractor {
    filter: FirFilter,
}

impl BycycleExtractor {
    pub fn new(filter: FirFilter) -> Self {
        Self { filter }
    }

    pub fn compute(
        &self,
        signal: &[f64],
        sampling_rate_hz: f64,
        band: FrequencyBand,
        thresholds: &ThresholdConfig,
    ) -> Result<FeatureTable, FeatureError> {
        let narrowband = self.filter.filter(
            signal,
            sampling_rate_hz,
            PassType::Bandpass {
                low_hz: band.low_hz,
                high_hz: band.high_hz,
            },
        )?;

        let (peaks, troughs) = find_extrema(signal, &narrowband);
        let cycles = segment_cycles(signal, &peaks, &troughs);

        let columns = FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect();
        let mut table = FeatureTable::new(columns);
        if cycles.is_empty() {
            return Ok(table);
        }

        let amplitude = analytic_amplitude(&narrowband);
        let shapes: Vec<ShapeFeatures> = cycles
            .iter()
            .enumerate()
            .map(|(i, cycle)| ShapeFeatures::measure(signal, &amplitude, cycle, cycles.get(i + 1)))
            .collect();
        let bursts = BurstFeatures::compute(signal, &cycles, &shapes, thresholds);

        for (i, (cycle, shape)) in cycles.iter().zip(&shapes).enumerate() {
            let row = vec![
                CellValue::from(shape.period),
                CellValue::from(shape.time_peak),
                shape.time_trough.map_or(CellValue::Missing, CellValue::from),
                CellValue::from(shape.volt_peak),
                CellValue::from(shape.volt_trough),
                CellValue::from(shape.time_decay),
                CellValue::from(shape.time_rise),
                CellValue::from(shape.volt_decay),
                CellValue::from(shape.volt_rise),
                CellValue::from(shape.volt_amp),
                CellValue::from(shape.time_rdsym),
                CellValue::from(shape.time_ptsym),
                CellValue::from(shape.band_amp),
                CellValue::from(cycle.peak),
                CellValue::from(cycle.zerox_decay),
                CellValue::from(cycle.zerox_rise),
                CellValue::from(cycle.last_trough),
                CellValue::from(cycle.next_trough),
                CellValue::from(bursts.amp_fraction[i]),
                CellValue::from(bursts.amp_consistency[i]),
                CellValue::from(bursts.period_consistency[i]),
                CellValue::from(bursts.monotonicity[i]),
                CellValue::from(bursts.is_burst[i]),
            ];
            table.push_row(row)?;
        }

        Ok(table)
    }
}

impl CycleFeatureExtractor for BycycleExtractor {
    fn extract(
        &self,
        signal: &[f64],
        sampling_rate_hz: f64,
        band: FrequencyBand,
        thresholds: &ThresholdConfig,
    ) -> Result<ExtractorOutput, FeatureError> {
        self.compute(signal, sampling_rate_hz, band, thresholds)
            .map(ExtractorOutput::Table)
    }
}

/// Rising and decaying zero crossings: index `i` where the sign changes between `i` and `i + 1`
pub fn flank_zerox(signal: &[f64]) -> (Vec<usize>, Vec<usize>) {
    let mut rises = Vec::new();
    let mut decays = Vec::new();
    for (i, pair) in signal.windows(2).enumerate() {
        let (before, after) = (pair[0] > 0.0, pair[1] > 0.0);
        if !before && after {
            rises.push(i);
        } else if before && !after {
            decays.push(i);
        }
    }
    (rises, decays)
}

/// Peaks between each rise and the following decay, troughs between each decay and the following rise
pub fn find_extrema(signal: &[f64], narrowband: &[f64]) -> (Vec<usize>, Vec<usize>) {
    let (rises, decays) = flank_zerox(narrowband);

    let peaks = rises
        .iter()
        .filter_map(|&rise| {
            let decay = *decays.get(decays.partition_point(|&d| d <= rise))?;
            Some(rise + argmax(&signal[rise..decay]))
        })
        .collect();

    let troughs = decays
        .iter()
        .filter_map(|&decay| {
            let rise = *rises.get(rises.partition_point(|&r| r <= decay))?;
            Some(decay + argmin(&signal[decay..rise]))
        })
        .collect();

    (peaks, troughs)
}

/// One cycle per peak that has a trough on both sides
pub fn segment_cycles(signal: &[f64], peaks: &[usize], troughs: &[usize]) -> Vec<Cycle> {
    peaks
        .iter()
        .filter_map(|&peak| {
            let before = troughs.partition_point(|&t| t < peak);
            let last_trough = *troughs.get(before.checked_sub(1)?)?;
            let next_trough = *troughs.get(troughs.partition_point(|&t| t <= peak))?;

            let rise_mid = (signal[last_trough] + signal[peak]) / 2.0;
            let zerox_rise = (last_trough + 1..=peak)
                .find(|&i| signal[i] > rise_mid)
                .unwrap_or((last_trough + peak) / 2);

            let decay_mid = (signal[peak] + signal[next_trough]) / 2.0;
            let zerox_decay = (peak + 1..=next_trough)
                .find(|&i| signal[i] < decay_mid)
                .unwrap_or((peak + next_trough) / 2);

            Some(Cycle {
                last_trough,
                peak,
                next_trough,
                zerox_rise,
                zerox_decay,
            })
        })
        .collect()
}

struct ShapeFeatures {
    period: usize,
    time_peak: usize,
    time_trough: Option<usize>,
    volt_peak: f64,
    volt_trough: f64,
    time_decay: usize,
    time_rise: usize,
    volt_decay: f64,
    volt_rise: f64,
    volt_amp: f64,
    time_rdsym: f64,
    time_ptsym: Option<f64>,
    band_amp: f64,
}

impl ShapeFeatures {
    fn measure(signal: &[f64], amplitude: &[f64], cycle: &Cycle, next: Option<&Cycle>) -> Self {
        let time_rise = cycle.peak - cycle.last_trough;
        let time_decay = cycle.next_trough - cycle.peak;
        let time_peak = cycle.zerox_decay.saturating_sub(cycle.zerox_rise);

        // Trough duration spans into the next cycle when the two share a trough
        let time_trough = next
            .filter(|n| n.last_trough == cycle.next_trough)
            .map(|n| n.zerox_rise.saturating_sub(cycle.zerox_decay));

        let volt_peak = signal[cycle.peak];
        let volt_rise = volt_peak - signal[cycle.last_trough];
        let volt_decay = volt_peak - signal[cycle.next_trough];

        let span = &amplitude[cycle.last_trough..cycle.next_trough];
        let band_amp = span.iter().sum::<f64>() / span.len() as f64;

        Self {
            period: cycle.next_trough - cycle.last_trough,
            time_peak,
            time_trough,
            volt_peak,
            volt_trough: signal[cycle.last_trough],
            time_decay,
            time_rise,
            volt_decay,
            volt_rise,
            volt_amp: (volt_rise + volt_decay) / 2.0,
            time_rdsym: time_rise as f64 / (time_rise + time_decay) as f64,
            time_ptsym: time_trough
                .filter(|&t| time_peak + t > 0)
                .map(|t| time_peak as f64 / (time_peak + t) as f64),
            band_amp,
        }
    }
}

struct BurstFeatures {
    amp_fraction: Vec<f64>,
    amp_consistency: Vec<Option<f64>>,
    period_consistency: Vec<Option<f64>>,
    monotonicity: Vec<f64>,
    is_burst: Vec<bool>,
}

impl BurstFeatures {
    fn compute(signal: &[f64], cycles: &[Cycle], shapes: &[ShapeFeatures], thresholds: &ThresholdConfig) -> Self {
        let n = cycles.len();
        let amps: Vec<f64> = shapes.iter().map(|s| s.volt_amp).collect();
        let amp_fraction: Vec<f64> = average_ranks(&amps).into_iter().map(|r| r / n as f64).collect();

        let interior = |i: usize| i > 0 && i + 1 < n;

        let amp_consistency: Vec<Option<f64>> = (0..n)
            .map(|i| {
                interior(i).then(|| {
                    let current = ratio(shapes[i].volt_rise, shapes[i].volt_decay);
                    let last = ratio(shapes[i].volt_rise, shapes[i - 1].volt_decay);
                    let next = ratio(shapes[i + 1].volt_rise, shapes[i].volt_decay);
                    current.min(last).min(next)
                })
            })
            .collect();

        let period_consistency: Vec<Option<f64>> = (0..n)
            .map(|i| {
                interior(i).then(|| {
                    let period = shapes[i].period as f64;
                    let last = ratio(period, shapes[i - 1].period as f64);
                    let next = ratio(period, shapes[i + 1].period as f64);
                    last.min(next)
                })
            })
            .collect();

        let monotonicity: Vec<f64> = cycles.iter().map(|c| monotonicity(signal, c)).collect();

        let mut is_burst: Vec<bool> = (0..n)
            .map(|i| {
                amp_fraction[i] > thresholds.amp_fraction_threshold
                    && amp_consistency[i].is_some_and(|v| v > thresholds.amp_consistency_threshold)
                    && period_consistency[i].is_some_and(|v| v > thresholds.period_consistency_threshold)
                    && monotonicity[i] > thresholds.monotonicity_threshold
            })
            .collect();
        enforce_min_run(&mut is_burst, thresholds.min_n_cycles);

        Self {
            amp_fraction,
            amp_consistency,
            period_consistency,
            monotonicity,
            is_burst,
        }
    }
}

fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
        .0
}

fn argmin(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::INFINITY), |best, (i, &v)| if v < best.1 { (i, v) } else { best })
        .0
}

/// `min / max` of two magnitudes; NaN when both are zero
fn ratio(a: f64, b: f64) -> f64 {
    let (a, b) = (a.abs(), b.abs());
    let high = a.max(b);
    if high == 0.0 {
        f64::NAN
    } else {
        a.min(b) / high
    }
}

/// Fraction of sample steps rising before the peak and falling after it
fn monotonicity(signal: &[f64], cycle: &Cycle) -> f64 {
    let fraction = |segment: &[f64], rising: bool| {
        let steps = segment.len().saturating_sub(1);
        if steps == 0 {
            return 0.0;
        }
        let good = segment
            .windows(2)
            .filter(|w| if rising { w[1] > w[0] } else { w[1] < w[0] })
            .count();
        good as f64 / steps as f64
    };

    let rise = fraction(&signal[cycle.last_trough..=cycle.peak], true);
    let decay = fraction(&signal[cycle.peak..=cycle.next_trough], false);
    (rise + decay) / 2.0
}

/// 1-based ranks, ties sharing their average rank
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; n];
    let mut start = 0;
    while start < n {
        let mut end = start;
        while end + 1 < n && values[order[end + 1]] == values[order[start]] {
            end += 1;
        }
        let rank = (start + end) as f64 / 2.0 + 1.0;
        for &index in &order[start..=end] {
            ranks[index] = rank;
        }
        start = end + 1;
    }
    ranks
}

/// Clear burst runs shorter than `min_cycles`
pub fn enforce_min_run(flags: &mut [bool], min_cycles: usize) {
    let mut start = 0;
    while start < flags.len() {
        if !flags[start] {
            start += 1;
            continue;
        }
        let mut end = start;
        while end < flags.len() && flags[end] {
            end += 1;
        }
        if end - start < min_cycles {
            flags[start..end].iter_mut().for_each(|f| *f = false);
        }
        start = end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::filters::FilterError;
    use std::f64::consts::PI;

    fn theta(freq: f64, fs: f64, seconds: f64) -> Vec<f64> {
        let n = (fs * seconds) as usize;
        (0..n).map(|i| (2.0 * PI * freq * i as f64 / fs).sin()).collect()
    }

    fn int(value: &CellValue) -> i64 {
        match value {
            CellValue::Int(v) => *v,
            other => panic!("expected integer, got {:?}", other),
        }
    }

    #[test]
    fn test_flank_zerox() {
        let (rises, decays) = flank_zerox(&[-1.0, 1.0, 2.0, -1.0, 0.0, 1.0]);
        assert_eq!(rises, vec![0, 4]);
        assert_eq!(decays, vec![2]);
    }

    #[test]
    fn test_average_ranks_ties() {
        assert_eq!(average_ranks(&[3.0, 1.0, 3.0, 2.0]), vec![3.5, 1.0, 3.5, 2.0]);
    }

    #[test]
    fn test_enforce_min_run() {
        let mut flags = vec![true, true, false, true, true, true, false, true];
        enforce_min_run(&mut flags, 3);
        assert_eq!(flags, vec![false, false, false, true, true, true, false, false]);
    }

    #[test]
    fn test_sine_cycles() {
        let fs = 400.0;
        let signal = theta(6.0, fs, 3.0);
        let table = BycycleExtractor::default()
            .compute(&signal, fs, FrequencyBand::new(3.0, 7.0), &ThresholdConfig::default())
            .unwrap();

        assert_eq!(table.columns(), &FEATURE_COLUMNS.map(String::from)[..]);
        assert!(table.n_rows() >= 14, "found {} cycles", table.n_rows());

        let periods = table.column("period").unwrap();
        for period in &periods[2..periods.len() - 2] {
            let samples = int(period);
            assert!((65..=68).contains(&samples), "period {}", samples);
        }

        let monotonicity = table.column("monotonicity").unwrap();
        assert!(monotonicity[3].as_f64().unwrap() > 0.9);

        let bursts = table.column("is_burst").unwrap();
        assert!(bursts.iter().any(|b| **b == CellValue::Bool(true)));

        // Edge cycles have no neighbor to compare against
        let consistency = table.column("amp_consistency").unwrap();
        assert!(consistency[0].is_missing());
        assert!(consistency[consistency.len() - 1].is_missing());
    }

    #[test]
    fn test_cycles_are_bracketed() {
        let fs = 400.0;
        let signal = theta(5.0, fs, 3.0);
        let table = BycycleExtractor::default()
            .compute(&signal, fs, FrequencyBand::new(3.0, 7.0), &ThresholdConfig::default())
            .unwrap();

        let last = table.column("sample_last_trough").unwrap();
        let peak = table.column("sample_peak").unwrap();
        let next = table.column("sample_next_trough").unwrap();
        for i in 0..table.n_rows() {
            assert!(int(last[i]) < int(peak[i]));
            assert!(int(peak[i]) < int(next[i]));
        }
    }

    #[test]
    fn test_flat_signal_has_no_cycles() {
        let table = BycycleExtractor::default()
            .compute(&vec![0.0; 1200], 400.0, FrequencyBand::new(3.0, 7.0), &ThresholdConfig::default())
            .unwrap();
        assert!(table.is_empty());
        assert_eq!(table.columns().len(), FEATURE_COLUMNS.len());
    }

    #[test]
    fn test_short_signal_fails() {
        let result = BycycleExtractor::default().compute(
            &theta(6.0, 400.0, 0.5),
            400.0,
            FrequencyBand::new(3.0, 7.0),
            &ThresholdConfig::default(),
        );
        assert!(matches!(
            result,
            Err(FeatureError::Filter(FilterError::SignalTooShort { .. }))
        ));
    }
}
