// src/utils/mod.rs
//! Common utility functions shared across the pipeline
//!
//! - Clock injection and `YYYYMMDD_HHMMSS` timestamp handling
//! - Elapsed-time formatting for run summaries

pub mod time;

// Re-export commonly used functions for convenience
pub use time::{format_elapsed, format_timestamp, parse_timestamp, Clock, MockClock, SystemClock};
