// src/processing/features/hilbert.rs
//! Analytic-signal amplitude through an FFT Hilbert transform

use rustfft::{num_complex::Complex, FftPlanner};

/// Instantaneous amplitude `|x + i·H(x)|` of a real signal
pub fn analytic_amplitude(signal: &[f64]) -> Vec<f64> {
    let n = signal.len();
    if n == 0 {
        return Vec::new();
    }

    let mut planner = FftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(n);
    let inverse = planner.plan_fft_inverse(n);

    let mut spectrum: Vec<Complex<f64>> = signal.iter().map(|&x| Complex::new(x, 0.0)).collect();
    forward.process(&mut spectrum);

    // Keep DC (and Nyquist for even n), double positive frequencies, drop negative ones
    for (k, bin) in spectrum.iter_mut().enumerate() {
        let gain = if k == 0 || (n % 2 == 0 && k == n / 2) {
            1.0
        } else if k < (n + 1) / 2 {
            2.0
        } else {
            0.0
        };
        *bin *= gain;
    }

    inverse.process(&mut spectrum);

    // rustfft does not normalize the inverse transform
    let scale = n as f64;
    spectrum.iter().map(|c| c.norm() / scale).collect()
}
