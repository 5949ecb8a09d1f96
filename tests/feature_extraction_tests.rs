// tests/feature_extraction_tests.rs
//! Integration tests for the default lowpass + cycle-by-cycle collaborators

use ndarray::{Array1, Array2};
use tempfile::tempdir;

use lfp_bycycle::aggregate::write_region_csv;
use lfp_bycycle::processing::driver::{extract_region_features, ExtractionParams};
use lfp_bycycle::processing::features::{BycycleExtractor, CellValue, FEATURE_COLUMNS};
use lfp_bycycle::processing::filters::FirFilter;
use lfp_bycycle::report::{Level, MemoryReporter, Scope};
use lfp_bycycle::trials::Trial;

const FS: f64 = 400.0;

/// Windowed trial, [-0.3, 2.8) s, one theta sine per channel at a different frequency
fn theta_trial(source_index: usize, freqs_hz: &[f64]) -> Trial {
    let n = 1240;
    let time = Array1::from_shape_fn(n, |i| -0.3 + i as f64 / FS);
    let signal = Array2::from_shape_fn((n, freqs_hz.len()), |(i, c)| {
        let t = i as f64 / FS;
        50.0 * (2.0 * std::f64::consts::PI * freqs_hz[c] * t).sin()
    });
    Trial {
        source_index,
        signal,
        time,
    }
}

#[test]
fn test_default_collaborators_produce_feature_tables() {
    let trials = vec![theta_trial(0, &[5.0, 6.0]), theta_trial(3, &[4.0, 6.5])];
    let reporter = MemoryReporter::new();

    let pairs = extract_region_features(
        &trials,
        2,
        &ExtractionParams::default(),
        &FirFilter::default(),
        &BycycleExtractor::default(),
        &reporter,
        &Scope::session("P01").with_region("HPC"),
    );

    assert_eq!(pairs.len(), 4);
    assert_eq!(reporter.count(Level::Error), 0);
    for pair in &pairs {
        let table = pair.table.as_ref().expect("extraction succeeded");
        assert_eq!(table.columns(), &FEATURE_COLUMNS.map(String::from)[..]);
        assert!(table.n_rows() >= 8, "trial {} channel {}: {} cycles", pair.trial, pair.channel, table.n_rows());
    }

    // 6 Hz at 400 Hz is ~67 samples per cycle
    let periods = pairs[1].table.as_ref().unwrap().column("period").unwrap();
    let middle = periods[periods.len() / 2].as_f64().unwrap();
    assert!((60.0..=73.0).contains(&middle), "period {}", middle);
}

#[test]
fn test_region_csv_from_real_features() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("P01_HPC_bycycle_features_20240101_120000.csv");
    let trials = vec![theta_trial(0, &[5.0])];
    let reporter = MemoryReporter::new();

    let pairs = extract_region_features(
        &trials,
        1,
        &ExtractionParams::default(),
        &FirFilter::default(),
        &BycycleExtractor::default(),
        &reporter,
        &Scope::root(),
    );
    let report = write_region_csv(&path, &pairs, &["CA1".to_string()], &reporter, &Scope::root()).unwrap();
    assert!(report.is_valid());

    let mut reader = csv::Reader::from_path(&path).unwrap();
    let header: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(&header[..3], &["trial", "channel_idx", "channel_label"]);
    assert_eq!(header.len(), 3 + FEATURE_COLUMNS.len());

    let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(rows.len(), report.rows_written);

    // Edge cycles have undefined consistency, written as empty cells
    let consistency = header.iter().position(|c| c == "amp_consistency").unwrap();
    assert_eq!(&rows[0][consistency], "");
    let burst = header.iter().position(|c| c == "is_burst").unwrap();
    assert!(rows.iter().all(|r| r[burst] == *"True" || r[burst] == *"False"));
    assert!(rows.iter().any(|r| &r[burst] == "True"));
}

#[test]
fn test_noise_has_no_bursts() {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(42);
    let n = 1240;
    let trial = Trial {
        source_index: 0,
        signal: Array2::from_shape_fn((n, 1), |_| rng.gen_range(-1.0..1.0)),
        time: Array1::from_shape_fn(n, |i| -0.3 + i as f64 / FS),
    };

    let table = BycycleExtractor::default()
        .compute(
            &trial.channel(0).unwrap(),
            FS,
            ExtractionParams::default().band,
            &ExtractionParams::default().thresholds,
        )
        .unwrap();
    let bursts = table.column("is_burst").unwrap_or_default();
    let burst_count = bursts.iter().filter(|b| ***b == CellValue::Bool(true)).count();
    assert!(burst_count < bursts.len().max(1), "noise classified entirely as bursts");
}
