//! Dispatch event hook
//!
//! Backends report what they did through a [`DispatchEvents`] implementation
//! handed to them at construction, instead of logging directly. The agent uses
//! [`TracingEvents`]; tests use `RecordingEvents` to assert on what was
//! reported.

#[cfg(test)]
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Severity of a dispatch event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    Debug,
    Info,
    Warning,
}

/// Sink for messages emitted while dispatching runs
pub trait DispatchEvents: Send + Sync {
    fn emit(&self, level: EventLevel, message: String);

    fn debug(&self, message: String) {
        self.emit(EventLevel::Debug, message);
    }

    fn info(&self, message: String) {
        self.emit(EventLevel::Info, message);
    }

    fn warning(&self, message: String) {
        self.emit(EventLevel::Warning, message);
    }
}

/// Forwards events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEvents;

impl DispatchEvents for TracingEvents {
    fn emit(&self, level: EventLevel, message: String) {
        match level {
            EventLevel::Debug => debug!("{}", message),
            EventLevel::Info => info!("{}", message),
            EventLevel::Warning => warn!("{}", message),
        }
    }
}

/// Keeps every event in memory
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct RecordingEvents {
    events: Arc<Mutex<Vec<(EventLevel, String)>>>,
}

#[cfg(test)]
impl RecordingEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events recorded so far
    pub fn events(&self) -> Vec<(EventLevel, String)> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Messages recorded at `level`
    pub fn messages(&self, level: EventLevel) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, message)| message)
            .collect()
    }
}

#[cfg(test)]
impl DispatchEvents for RecordingEvents {
    fn emit(&self, level: EventLevel, message: String) {
        if let Ok(mut events) = self.events.lock() {
            events.push((level, message));
        }
    }
}
