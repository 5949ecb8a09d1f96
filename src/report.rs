// src/report.rs
//! Scope-aware reporting
//!
//! Components never log through a process-wide logger directly. They receive a
//! [`Reporter`] and a [`Scope`] naming the session, region, trial and channel
//! being processed, so every message carries enough context to reproduce the
//! failure. [`TracingReporter`] forwards to `tracing`; [`MemoryReporter`]
//! captures events for inspection.

use std::fmt;
use std::sync::Mutex;

/// Where in the session/region/trial/channel hierarchy an event happened
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    pub session: Option<String>,
    pub region: Option<String>,
    pub trial: Option<usize>,
    pub channel: Option<usize>,
}

impl Scope {
    /// Run-level scope
    pub fn root() -> Self {
        Self::default()
    }

    pub fn session(session_id: &str) -> Self {
        Self {
            session: Some(session_id.to_string()),
            ..Self::default()
        }
    }

    pub fn with_region(&self, region: &str) -> Self {
        Self {
            region: Some(region.to_string()),
            ..self.clone()
        }
    }

    pub fn with_trial(&self, trial: usize) -> Self {
        Self {
            trial: Some(trial),
            ..self.clone()
        }
    }

    pub fn with_channel(&self, channel: usize) -> Self {
        Self {
            channel: Some(channel),
            ..self.clone()
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(session) = &self.session {
            parts.push(format!("session={}", session));
        }
        if let Some(region) = &self.region {
            parts.push(format!("region={}", region));
        }
        if let Some(trial) = self.trial {
            parts.push(format!("trial={}", trial));
        }
        if let Some(channel) = self.channel {
            parts.push(format!("channel={}", channel));
        }
        if parts.is_empty() {
            f.write_str("run")
        } else {
            f.write_str(&parts.join(" "))
        }
    }
}

/// Event severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

/// One reported message
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub level: Level,
    pub scope: Scope,
    pub message: String,
}

/// Injectable reporting capability
pub trait Reporter: Send + Sync {
    fn emit(&self, event: Event);

    fn debug(&self, scope: &Scope, message: String) {
        self.emit(Event { level: Level::Debug, scope: scope.clone(), message });
    }

    fn info(&self, scope: &Scope, message: String) {
        self.emit(Event { level: Level::Info, scope: scope.clone(), message });
    }

    fn warn(&self, scope: &Scope, message: String) {
        self.emit(Event { level: Level::Warn, scope: scope.clone(), message });
    }

    fn error(&self, scope: &Scope, message: String) {
        self.emit(Event { level: Level::Error, scope: scope.clone(), message });
    }
}

/// Forwards events to the installed `tracing` subscriber
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn emit(&self, event: Event) {
        let scope = &event.scope;
        match event.level {
            Level::Debug => tracing::debug!(scope = %scope, "{}", event.message),
            Level::Info => tracing::info!(scope = %scope, "{}", event.message),
            Level::Warn => tracing::warn!(scope = %scope, "{}", event.message),
            Level::Error => tracing::error!(scope = %scope, "{}", event.message),
        }
    }
}

/// Captures events in memory
#[derive(Debug, Default)]
pub struct MemoryReporter {
    events: Mutex<Vec<Event>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every event so far
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn count(&self, level: Level) -> usize {
        self.events().iter().filter(|e| e.level == level).count()
    }

    /// Events at `level` whose message contains `needle`
    pub fn find(&self, level: Level, needle: &str) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| e.level == level && e.message.contains(needle))
            .collect()
    }
}

impl Reporter for MemoryReporter {
    fn emit(&self, event: Event) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_display() {
        assert_eq!(Scope::root().to_string(), "run");

        let scope = Scope::session("P01").with_region("HPC").with_trial(2).with_channel(5);
        assert_eq!(scope.to_string(), "session=P01 region=HPC trial=2 channel=5");
    }

    #[test]
    fn test_memory_reporter_captures_scope() {
        let reporter = MemoryReporter::new();
        let scope = Scope::session("P01").with_region("HPC");

        reporter.warn(&scope, "label missing".to_string());
        reporter.info(&scope.with_trial(0), "trial accepted".to_string());

        assert_eq!(reporter.count(Level::Warn), 1);
        let found = reporter.find(Level::Info, "accepted");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].scope.trial, Some(0));
        assert_eq!(found[0].scope.region.as_deref(), Some("HPC"));
    }

    #[test]
    fn test_tracing_reporter_without_subscriber() {
        // No subscriber installed: events are dropped silently
        TracingReporter.error(&Scope::root(), "nothing listens".to_string());
    }
}
