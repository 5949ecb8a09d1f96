// src/trials.rs
//! Trial loading and reconciliation
//!
//! Each trial of a region is a pair of references, one to a signal matrix and
//! one to a time vector. Loading resolves both, orients the signal as
//! samples × channels, reconciles lengths, applies the analysis window, and
//! drops trials that are unusable. Individual trial failures never abort the
//! region.

use ndarray::{Array1, Array2, ArrayD, Axis, Ix1, Ix2};

use crate::config::TimeWindow;
use crate::container::{resolve, CellArray, CellLayout, Container, ContainerError};
use crate::report::{Reporter, Scope};

/// One accepted trial, co-indexed by sample
#[derive(Debug, Clone, PartialEq)]
pub struct Trial {
    /// Position of the trial in the container's reference array
    pub source_index: usize,
    /// Rows are samples, columns are channels
    pub signal: Array2<f64>,
    pub time: Array1<f64>,
}

impl Trial {
    pub fn n_samples(&self) -> usize {
        self.signal.nrows()
    }

    pub fn n_channels(&self) -> usize {
        self.signal.ncols()
    }

    /// Samples of one channel, or `None` when the trial has fewer channels
    pub fn channel(&self, channel: usize) -> Option<Vec<f64>> {
        if channel >= self.n_channels() {
            return None;
        }
        Some(self.signal.column(channel).to_vec())
    }
}

/// Load every usable trial of a region
///
/// Returns an error only when a reference array has an unsupported shape.
/// The trial count is taken from the signal references.
pub fn load_trials(
    container: &dyn Container,
    signal_refs: &CellArray,
    time_refs: &CellArray,
    window: TimeWindow,
    reporter: &dyn Reporter,
    scope: &Scope,
) -> Result<Vec<Trial>, ContainerError> {
    let signal_layout = CellLayout::of(signal_refs)?;
    let time_layout = CellLayout::of(time_refs)?;

    reporter.info(scope, format!("Number of trials: {}", signal_layout.len()));
    reporter.debug(
        scope,
        format!(
            "Signal reference shape {:?}, time reference shape {:?}",
            signal_refs.shape(),
            time_refs.shape()
        ),
    );
    if time_layout.len() < signal_layout.len() {
        reporter.warn(
            scope,
            format!(
                "Time references ({}) fewer than signal references ({})",
                time_layout.len(),
                signal_layout.len()
            ),
        );
    }

    let mut trials = Vec::new();
    for index in 0..signal_layout.len() {
        let trial_scope = scope.with_trial(index);

        let signal = signal_layout
            .get(signal_refs, index)
            .and_then(|element| resolve(container, element, reporter, &trial_scope));
        let Some(signal) = signal else {
            reporter.warn(&trial_scope, "Signal data unavailable, skipping trial".to_string());
            continue;
        };

        let time = time_layout
            .get(time_refs, index)
            .and_then(|element| resolve(container, element, reporter, &trial_scope));
        let Some(time) = time else {
            reporter.warn(&trial_scope, "Time data unavailable, skipping trial".to_string());
            continue;
        };

        let signal = match signal.to_f64().and_then(orient_signal) {
            Ok(signal) => signal,
            Err(err) => {
                reporter.warn(&trial_scope, format!("Unusable signal payload: {}", err));
                continue;
            }
        };
        let time = match time.to_f64() {
            Ok(time) => Array1::from_iter(time.iter().copied()),
            Err(err) => {
                reporter.warn(&trial_scope, format!("Unusable time payload: {}", err));
                continue;
            }
        };

        if let Some(trial) = reconcile_trial(index, signal, time, window, reporter, &trial_scope) {
            reporter.info(
                &trial_scope,
                format!(
                    "Accepted trial with {} samples, {} channels",
                    trial.n_samples(),
                    trial.n_channels()
                ),
            );
            trials.push(trial);
        }
    }

    Ok(trials)
}

/// Transpose a stored `channels × samples` matrix; a vector is one channel
pub fn orient_signal(payload: ArrayD<f64>) -> Result<Array2<f64>, ContainerError> {
    let shape = payload.shape().to_vec();
    match shape.len() {
        1 => {
            let samples = payload
                .into_dimensionality::<Ix1>()
                .map_err(|_| ContainerError::UnsupportedShape { shape: shape.clone() })?;
            Ok(samples.insert_axis(Axis(1)))
        }
        2 => {
            let matrix = payload
                .into_dimensionality::<Ix2>()
                .map_err(|_| ContainerError::UnsupportedShape { shape: shape.clone() })?;
            Ok(matrix.reversed_axes().as_standard_layout().into_owned())
        }
        _ => Err(ContainerError::UnsupportedShape { shape }),
    }
}

/// Truncate to a common length, window, and reject non-finite trials
pub fn reconcile_trial(
    source_index: usize,
    mut signal: Array2<f64>,
    mut time: Array1<f64>,
    window: TimeWindow,
    reporter: &dyn Reporter,
    scope: &Scope,
) -> Option<Trial> {
    if signal.nrows() != time.len() {
        let shorter = signal.nrows().min(time.len());
        reporter.warn(
            scope,
            format!(
                "Length mismatch: signal has {} samples, time has {}; truncating to {}",
                signal.nrows(),
                time.len(),
                shorter
            ),
        );
        signal = signal.slice_move(ndarray::s![..shorter, ..]);
        time = time.slice_move(ndarray::s![..shorter]);
    }

    let keep: Vec<usize> = time
        .iter()
        .enumerate()
        .filter(|(_, t)| window.contains(**t))
        .map(|(i, _)| i)
        .collect();
    let signal = signal.select(Axis(0), &keep);
    let time = time.select(Axis(0), &keep);
    reporter.debug(scope, format!("{} samples inside the time window", time.len()));

    if signal.iter().any(|v| !v.is_finite()) {
        reporter.warn(scope, "Trial contains NaN or infinite values, skipping".to_string());
        return None;
    }

    Some(Trial { source_index, signal, time })
}
