// src/processing/filters/fir.rs
//! FIR (Finite Impulse Response) windowed-sinc filters
//!
//! Kernels are Hamming-windowed sincs sized to a fixed number of cycles of
//! the lowest cutoff, normalized to unity DC gain, and applied as a centered
//! convolution so the output stays aligned with the input.

use std::f64::consts::PI;

use super::{FilterError, PassType, SignalFilter};
use crate::config::constants::processing::DEFAULT_FILTER_CYCLES;

/// Whole-signal FIR filter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FirFilter {
    n_cycles: f64,
}

impl Default for FirFilter {
    fn default() -> Self {
        Self { n_cycles: DEFAULT_FILTER_CYCLES }
    }
}

impl FirFilter {
    pub fn new(n_cycles: f64) -> Result<Self, FilterError> {
        if !(n_cycles.is_finite() && n_cycles > 0.0) {
            return Err(FilterError::InvalidParameters(format!(
                "n_cycles must be positive, got {}",
                n_cycles
            )));
        }
        Ok(Self { n_cycles })
    }

    pub fn n_cycles(&self) -> f64 {
        self.n_cycles
    }

    /// `ceil(n_cycles * fs / cutoff)`, rounded up to the next odd length
    pub fn kernel_length(&self, sampling_rate_hz: f64, cutoff_hz: f64) -> usize {
        let length = (self.n_cycles * sampling_rate_hz / cutoff_hz).ceil().max(1.0) as usize;
        if length % 2 == 0 {
            length + 1
        } else {
            length
        }
    }

    /// Design the kernel for a pass type
    pub fn design(&self, sampling_rate_hz: f64, pass: PassType) -> Result<Vec<f64>, FilterError> {
        validate_pass(sampling_rate_hz, pass)?;

        match pass {
            PassType::Lowpass { cutoff_hz } => {
                let length = self.kernel_length(sampling_rate_hz, cutoff_hz);
                Ok(lowpass_windowed_sinc(cutoff_hz, sampling_rate_hz, length))
            }
            PassType::Highpass { cutoff_hz } => {
                let length = self.kernel_length(sampling_rate_hz, cutoff_hz);
                let mut kernel = lowpass_windowed_sinc(cutoff_hz, sampling_rate_hz, length);
                kernel.iter_mut().for_each(|c| *c = -*c);
                kernel[length / 2] += 1.0;
                Ok(kernel)
            }
            PassType::Bandpass { low_hz, high_hz } => {
                let length = self.kernel_length(sampling_rate_hz, low_hz);
                let high = lowpass_windowed_sinc(high_hz, sampling_rate_hz, length);
                let low = lowpass_windowed_sinc(low_hz, sampling_rate_hz, length);
                Ok(high.iter().zip(&low).map(|(h, l)| h - l).collect())
            }
        }
    }
}

impl SignalFilter for FirFilter {
    fn filter(&self, signal: &[f64], sampling_rate_hz: f64, pass: PassType) -> Result<Vec<f64>, FilterError> {
        if signal.is_empty() {
            return Err(FilterError::EmptySignal);
        }
        let kernel = self.design(sampling_rate_hz, pass)?;
        if signal.len() < kernel.len() {
            return Err(FilterError::SignalTooShort {
                signal_len: signal.len(),
                kernel_len: kernel.len(),
            });
        }
        Ok(convolve_same(signal, &kernel))
    }
}

fn validate_pass(sampling_rate_hz: f64, pass: PassType) -> Result<(), FilterError> {
    if !(sampling_rate_hz.is_finite() && sampling_rate_hz > 0.0) {
        return Err(FilterError::InvalidParameters(format!(
            "Sampling rate must be positive, got {}",
            sampling_rate_hz
        )));
    }
    let nyquist = sampling_rate_hz / 2.0;
    let check = |name: &str, f: f64| {
        if f.is_finite() && f > 0.0 && f < nyquist {
            Ok(())
        } else {
            Err(FilterError::InvalidParameters(format!(
                "{} {} Hz outside (0, {}) Hz",
                name, f, nyquist
            )))
        }
    };

    match pass {
        PassType::Lowpass { cutoff_hz } | PassType::Highpass { cutoff_hz } => check("Cutoff", cutoff_hz),
        PassType::Bandpass { low_hz, high_hz } => {
            check("Low edge", low_hz)?;
            check("High edge", high_hz)?;
            if low_hz >= high_hz {
                return Err(FilterError::InvalidParameters(format!(
                    "Band ({}, {}) Hz is not increasing",
                    low_hz, high_hz
                )));
            }
            Ok(())
        }
    }
}

/// Hamming-windowed sinc lowpass, normalized to unity DC gain
pub fn lowpass_windowed_sinc(cutoff_hz: f64, sampling_rate_hz: f64, length: usize) -> Vec<f64> {
    if length <= 1 {
        return vec![1.0; length];
    }

    let fc = cutoff_hz / sampling_rate_hz;
    let m = (length - 1) / 2;

    let mut coefficients: Vec<f64> = (0..length)
        .map(|i| {
            let n = i as f64 - m as f64;
            let sinc = if i == m {
                2.0 * fc
            } else {
                (2.0 * PI * fc * n).sin() / (PI * n)
            };

            // Apply Hamming window
            let window = 0.54 - 0.46 * (2.0 * PI * i as f64 / (length - 1) as f64).cos();
            sinc * window
        })
        .collect();

    let gain: f64 = coefficients.iter().sum();
    if gain != 0.0 {
        coefficients.iter_mut().for_each(|c| *c /= gain);
    }
    coefficients
}

/// Centered convolution with zero padding; output length equals input length
pub fn convolve_same(signal: &[f64], kernel: &[f64]) -> Vec<f64> {
    let n = signal.len() as isize;
    let half = (kernel.len() / 2) as isize;

    (0..n)
        .map(|i| {
            kernel
                .iter()
                .enumerate()
                .filter_map(|(k, &h)| {
                    let j = i + half - k as isize;
                    (0..n).contains(&j).then(|| h * signal[j as usize])
                })
                .sum()
        })
        .collect()
}
