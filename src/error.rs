// src/error.rs
//! Unified error handling for the feature pipeline
//!
//! Every failure is classified by the narrowest scope it invalidates (run,
//! session, region, pair, or soft). Component errors are defined next to the
//! component that raises them and are folded into [`PipelineError`] here, so
//! the orchestrator can decide what to skip without inspecting messages.

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::panic::Location;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregate::AggregateError;
use crate::config::ConfigError;
use crate::container::ContainerError;
use crate::metadata::MetadataError;
use crate::processing::features::FeatureError;
use crate::processing::filters::FilterError;

/// How much work a failure invalidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FailureScope {
    /// Logged only; nothing is skipped
    Soft,
    /// One trial or one (trial, channel) pair is skipped
    Pair,
    /// The current region is skipped
    Region,
    /// The current session is skipped
    Session,
    /// The whole run stops
    Run,
}

impl fmt::Display for FailureScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureScope::Soft => "soft",
            FailureScope::Pair => "pair",
            FailureScope::Region => "region",
            FailureScope::Session => "session",
            FailureScope::Run => "run",
        };
        f.write_str(name)
    }
}

/// Error context for debugging and analysis
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    pub component: String,
    pub operation: String,
    pub file: Option<&'static str>,
    pub line: Option<u32>,
    pub additional_info: BTreeMap<String, String>,
}

impl ErrorContext {
    /// Create a new error context
    pub fn new(component: &str, operation: &str) -> Self {
        Self {
            component: component.to_string(),
            operation: operation.to_string(),
            ..Self::default()
        }
    }

    /// Create error context with file and line information
    pub fn with_location(component: &str, operation: &str, file: &'static str, line: u32) -> Self {
        let mut context = Self::new(component, operation);
        context.file = Some(file);
        context.line = Some(line);
        context
    }

    /// Add additional information to the context
    pub fn add_info<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.additional_info.insert(key.into(), value.to_string());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.component, self.operation)?;
        if !self.additional_info.is_empty() {
            let info: Vec<String> = self
                .additional_info
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            write!(f, " [{}]", info.join(", "))?;
        }
        if let (Some(file), Some(line)) = (self.file, self.line) {
            write!(f, " at {}:{}", file, line)?;
        }
        Ok(())
    }
}

/// Unified error type for the pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Container open, lookup or dereference failure
    #[error("[CONTAINER] {source} ({context})")]
    Container {
        #[source]
        source: ContainerError,
        scope: FailureScope,
        context: ErrorContext,
    },

    /// A required input (file, group, or key) is absent
    #[error("[INPUT] {reason} ({context})")]
    MissingInput {
        reason: String,
        scope: FailureScope,
        context: ErrorContext,
    },

    /// Nothing usable survived loading
    #[error("[DATA] {reason} ({context})")]
    NoData {
        reason: String,
        scope: FailureScope,
        context: ErrorContext,
    },

    /// External metadata could not be loaded
    #[error("[METADATA] {0}")]
    Metadata(#[from] MetadataError),

    /// Invalid configuration
    #[error("[CONFIG] {0}")]
    Config(#[from] ConfigError),

    /// Lowpass or bandpass filter failure
    #[error("[FILTER] {0}")]
    Filter(#[from] FilterError),

    /// Cycle feature extraction failure
    #[error("[FEATURES] {0}")]
    Feature(#[from] FeatureError),

    /// CSV artifact failure
    #[error("[AGGREGATE] {0}")]
    Aggregate(#[from] AggregateError),

    /// Foreign error wrapped through [`IntoPipelineError`]
    #[error("[SYSTEM] {subsystem} error: {reason} ({context})")]
    System {
        subsystem: String,
        reason: String,
        context: ErrorContext,
    },
}

impl PipelineError {
    /// The scope this error invalidates
    pub fn scope(&self) -> FailureScope {
        match self {
            PipelineError::Container { scope, .. }
            | PipelineError::MissingInput { scope, .. }
            | PipelineError::NoData { scope, .. } => *scope,
            PipelineError::Metadata(_) | PipelineError::Config(_) => FailureScope::Run,
            PipelineError::Filter(_) | PipelineError::Feature(_) => FailureScope::Pair,
            PipelineError::Aggregate(_) | PipelineError::System { .. } => FailureScope::Session,
        }
    }

}

/// Result type alias for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Error builder for convenient error construction
///
/// The context records where the builder was created.
pub struct PipelineErrorBuilder {
    context: ErrorContext,
}

impl PipelineErrorBuilder {
    /// Start an error raised by `component` during `operation`
    #[track_caller]
    pub fn new(component: &str, operation: &str) -> Self {
        let location = Location::caller();
        Self {
            context: ErrorContext::with_location(component, operation, location.file(), location.line()),
        }
    }

    /// Attach a key/value pair to the context
    pub fn info<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.context = self.context.add_info(key, value);
        self
    }

    /// A required file, group or key is absent
    pub fn missing_input(self, scope: FailureScope, reason: impl Into<String>) -> PipelineError {
        PipelineError::MissingInput {
            reason: reason.into(),
            scope,
            context: self.context,
        }
    }

    /// Nothing usable survived loading
    pub fn no_data(self, scope: FailureScope, reason: impl Into<String>) -> PipelineError {
        PipelineError::NoData {
            reason: reason.into(),
            scope,
            context: self.context,
        }
    }

    /// Wrap a container failure
    pub fn container(self, scope: FailureScope, source: ContainerError) -> PipelineError {
        PipelineError::Container {
            source,
            scope,
            context: self.context,
        }
    }
}

/// Convenience trait for wrapping foreign errors
pub trait IntoPipelineError<T> {
    /// Wrap the error as [`PipelineError::System`]
    fn pipeline_err(self, component: &str, operation: &str) -> PipelineResult<T>;
}

impl<T, E> IntoPipelineError<T> for Result<T, E>
where
    E: Error + Send + Sync + 'static,
{
    #[track_caller]
    fn pipeline_err(self, component: &str, operation: &str) -> PipelineResult<T> {
        let location = Location::caller();
        self.map_err(|err| PipelineError::System {
            subsystem: component.to_string(),
            reason: err.to_string(),
            context: ErrorContext::with_location(component, operation, location.file(), location.line()),
        })
    }
}
