// src/processing/mod.rs
//! Signal processing for LFP trials

pub mod driver;
pub mod features;
pub mod filters;

pub use driver::*;
pub use features::{BycycleExtractor, CycleFeatureExtractor, ExtractorOutput, FeatureError, FeatureTable};
pub use filters::{FilterError, FirFilter, PassType, SignalFilter};
