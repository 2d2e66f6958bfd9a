//! Caller-supplied logging sink for analysis runs.
//!
//! The analysis code never touches a global logger; whoever drives a run
//! passes an `Observer` in and decides where the messages go.

use std::cell::RefCell;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warn,
}

pub trait Observer {
    fn observe(&self, level: Level, stage: &str, message: &str);

    fn debug(&self, stage: &str, message: &str) {
        self.observe(Level::Debug, stage, message);
    }

    fn info(&self, stage: &str, message: &str) {
        self.observe(Level::Info, stage, message);
    }

    fn warn(&self, stage: &str, message: &str) {
        self.observe(Level::Warn, stage, message);
    }
}

/// Forwards to `tracing` with the stage as a structured field.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn observe(&self, level: Level, stage: &str, message: &str) {
        match level {
            Level::Debug => tracing::debug!(stage, "{}", message),
            Level::Info => tracing::info!(stage, "{}", message),
            Level::Warn => tracing::warn!(stage, "{}", message),
        }
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl Observer for NullObserver {
    fn observe(&self, _level: Level, _stage: &str, _message: &str) {}
}

/// Keeps every message in memory, in arrival order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: RefCell<Vec<(Level, String, String)>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<(Level, String, String)> {
        self.events.borrow().clone()
    }

    pub fn count(&self, level: Level) -> usize {
        self.events.borrow().iter().filter(|e| e.0 == level).count()
    }

    pub fn stages(&self) -> Vec<String> {
        self.events.borrow().iter().map(|e| e.1.clone()).collect()
    }
}

impl Observer for RecordingObserver {
    fn observe(&self, level: Level, stage: &str, message: &str) {
        self.events
            .borrow_mut()
            .push((level, stage.to_string(), message.to_string()));
    }
}
