// src/processing/filters/mod.rs
//! Digital filters for LFP signal conditioning

pub mod fir;

pub use fir::*;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pass band of a filter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PassType {
    Lowpass { cutoff_hz: f64 },
    Highpass { cutoff_hz: f64 },
    Bandpass { low_hz: f64, high_hz: f64 },
}

/// Zero-phase filtering of a whole signal
pub trait SignalFilter: Send + Sync {
    fn filter(&self, signal: &[f64], sampling_rate_hz: f64, pass: PassType) -> Result<Vec<f64>, FilterError>;
}

/// Common filter error types
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Signal of {signal_len} samples is shorter than the {kernel_len}-tap kernel")]
    SignalTooShort { signal_len: usize, kernel_len: usize },

    #[error("Signal is empty")]
    EmptySignal,
}
