//! LFP-Bycycle: cycle-by-cycle feature extraction for per-trial LFP recordings
//!
//! This library turns preprocessed session containers (MATLAB v7.3 files holding
//! cell arrays of object references) into per-cycle feature tables, organised by
//! session and anatomical region. It features:
//!
//! - Reference resolution over a pluggable hierarchical container backend
//! - Label decoding and trial loading with shape and length reconciliation
//! - Lowpass filtering and cycle-by-cycle waveform feature extraction
//! - Region-level CSV aggregation and session-level merging with retention
//! - Layered configuration and an injectable, scope-aware reporter
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use lfp_bycycle::config::PipelineConfig;
//! use lfp_bycycle::metadata::{load_session_plan, FileEngineLauncher};
//! use lfp_bycycle::pipeline::{PipelineBuilder, RunPaths};
//! use lfp_bycycle::report::TracingReporter;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let reporter = TracingReporter;
//!     let plan = load_session_plan(&FileEngineLauncher, "meta/metaDataExt.json".as_ref(), &reporter)?;
//!
//!     let paths = RunPaths::new("out/csv", "data/preprocessed");
//!     let pipeline = PipelineBuilder::new(PipelineConfig::default(), paths).build();
//!     let summary = pipeline.run(&plan);
//!     println!("{} region tables written", summary.regions_written());
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod aggregate;
pub mod config;
pub mod container;
pub mod error;
pub mod labels;
pub mod metadata;
pub mod pipeline;
pub mod processing;
pub mod report;
pub mod trials;
pub mod utils;

// Re-export commonly used types for convenience
pub use container::{resolve, CellArray, CellLayout, Container, ContainerOpener, Element, ObjectRef, Payload};
pub use error::{FailureScope, PipelineError, PipelineResult};
pub use processing::features::{CycleFeatureExtractor, FeatureTable};
pub use processing::filters::SignalFilter;
pub use report::{Reporter, Scope};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
