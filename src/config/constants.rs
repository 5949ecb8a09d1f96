// src/config/constants.rs
//! Pipeline-wide configuration constants

/// Signal processing constants
pub mod processing {
    pub const DEFAULT_SAMPLING_RATE_HZ: f64 = 400.0;
    pub const DEFAULT_WINDOW_START_S: f64 = -0.3;
    pub const DEFAULT_WINDOW_END_S: f64 = 2.8;
    pub const DEFAULT_LOWPASS_CUTOFF_HZ: f64 = 30.0;

    /// Theta band (low, high) in Hz
    pub const DEFAULT_BAND_HZ: (f64, f64) = (3.0, 7.0);

    /// Filter length expressed in cycles of the (lowest) cutoff frequency
    pub const DEFAULT_FILTER_CYCLES: f64 = 3.0;
}

/// Burst detection thresholds
pub mod thresholds {
    pub const AMP_FRACTION: f64 = 0.2;
    pub const AMP_CONSISTENCY: f64 = 0.1;
    pub const PERIOD_CONSISTENCY: f64 = 0.4;
    pub const MONOTONICITY: f64 = 0.4;
    pub const MIN_N_CYCLES: usize = 3;
}

/// Container layout and artifact naming
pub mod layout {
    /// Group holding per-region cell arrays
    pub const DATA_GROUP: &str = "filteredPatientData";
    pub const LABELS_SUFFIX: &str = "_labels";
    pub const SIGNAL_SUFFIX: &str = "_selectedChanSpkRmvl";
    pub const TIME_KEY: &str = "time";

    /// Input files are `<session_id>*<INPUT_SUFFIX>`
    pub const INPUT_SUFFIX: &str = "selectedChanSpkRmvl.mat";

    pub const FEATURE_TAG: &str = "bycycle_features";
    pub const MERGED_TAG: &str = "merged";
    pub const CSV_EXTENSION: &str = "csv";
}

/// Timestamp formats
pub mod time {
    /// `YYYYMMDD_HHMMSS`
    pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
    pub const TIMESTAMP_LEN: usize = 15;
}

/// Configuration discovery and environment overrides
pub mod paths {
    pub const DEFAULT_CONFIG_FILE: &str = "bycycle.toml";
    pub const LOCAL_CONFIG_FILE: &str = "config/bycycle.toml";
    pub const ENV_PREFIX: &str = "BYCYCLE__";
    pub const ENV_SEPARATOR: &str = "__";
    pub const DEFAULT_LOG_DIR: &str = "logs";
    pub const LOG_FILE_PREFIX: &str = "RunBycycle";
}

/// Artifact validation
pub mod validation {
    pub const REQUIRED_COLUMNS: [&str; 3] = ["trial", "channel_idx", "channel_label"];
    pub const MIN_DATA_ROWS: usize = 1;
}
