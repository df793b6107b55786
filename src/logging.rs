//! Injected logging capability.
//!
//! The core never owns a process-wide logger. A host binds a delivery
//! callback once (typically at startup) and passes it into the entry points
//! that need it; every call also emits a `tracing` event at the matching
//! level so a host that prefers a `tracing` subscriber gets structured
//! output for free without wiring up a callback at all.

use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

/// A delivery callback supplied by the host. Must be reentrant-safe if the
/// host intends to load multiple cases concurrently (see concurrency model).
pub type LogCallback = Arc<dyn Fn(LogLevel, &str) + Send + Sync>;

#[derive(Clone, Default)]
pub struct Logger {
    sink: Option<LogCallback>,
}

impl Logger {
    pub fn new(sink: LogCallback) -> Self {
        Self { sink: Some(sink) }
    }

    pub fn silent() -> Self {
        Self { sink: None }
    }

    pub fn log(&self, level: LogLevel, message: impl AsRef<str>) {
        let message = message.as_ref();
        match level {
            LogLevel::Info => tracing::info!("{message}"),
            LogLevel::Warning => tracing::warn!("{message}"),
            LogLevel::Error => tracing::error!("{message}"),
        }
        if let Some(sink) = &self.sink {
            sink(level, message);
        }
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Info, message);
    }

    pub fn warning(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Warning, message);
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Error, message);
    }
}
