// benches/cycle_features.rs
//! Throughput of the lowpass filter and the cycle-by-cycle extractor over
//! trial-length theta signals

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use lfp_bycycle::config::{FrequencyBand, ThresholdConfig};
use lfp_bycycle::processing::features::BycycleExtractor;
use lfp_bycycle::processing::filters::{FirFilter, PassType, SignalFilter};

const FS: f64 = 400.0;
const DURATIONS_S: &[f64] = &[3.1, 10.0, 60.0];

/// 5 Hz sine plus uniform noise
fn theta_signal(seconds: f64, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let n = (seconds * FS) as usize;
    (0..n)
        .map(|i| {
            let t = i as f64 / FS;
            (2.0 * std::f64::consts::PI * 5.0 * t).sin() + rng.gen_range(-0.2..0.2)
        })
        .collect()
}

fn benchmark_lowpass(c: &mut Criterion) {
    let mut group = c.benchmark_group("lowpass");
    let filter = FirFilter::default();

    for &seconds in DURATIONS_S {
        let signal = theta_signal(seconds, 7);
        group.throughput(Throughput::Elements(signal.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(format!("{}s", seconds)), &signal, |b, signal| {
            b.iter(|| {
                filter
                    .filter(black_box(signal), FS, PassType::Lowpass { cutoff_hz: 30.0 })
                    .ok()
            });
        });
    }
    group.finish();
}

fn benchmark_extractor(c: &mut Criterion) {
    let mut group = c.benchmark_group("bycycle");
    let extractor = BycycleExtractor::default();
    let band = FrequencyBand::new(3.0, 7.0);
    let thresholds = ThresholdConfig::default();

    for &seconds in DURATIONS_S {
        let signal = theta_signal(seconds, 11);
        group.throughput(Throughput::Elements(signal.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(format!("{}s", seconds)), &signal, |b, signal| {
            b.iter(|| extractor.compute(black_box(signal), FS, band, &thresholds).ok());
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_lowpass, benchmark_extractor);
criterion_main!(benches);
