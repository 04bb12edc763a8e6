//! Function log sink
//!
//! Functions log through the invocation context rather than through
//! `tracing` directly so that the host can route their messages (for example
//! into a per-connection event log) separately from Ferry's own diagnostics.

use std::fmt;

#[cfg(test)]
#[path = "log_test.rs"]
mod tests;

/// Severity of a function log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Destination for function log lines
pub trait LogSink: Send + Sync {
    fn log(&self, level: Level, function_id: &str, message: &str);
}

/// Log sink that forwards to `tracing` with the function id as a field
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn log(&self, level: Level, function_id: &str, message: &str) {
        match level {
            Level::Debug => tracing::debug!(function_id, "{message}"),
            Level::Info => tracing::info!(function_id, "{message}"),
            Level::Warn => tracing::warn!(function_id, "{message}"),
            Level::Error => tracing::error!(function_id, "{message}"),
        }
    }
}

/// Log handle bound to one function
#[derive(Clone, Copy)]
pub struct FunctionLog<'a> {
    sink: &'a dyn LogSink,
    function_id: &'a str,
}

impl<'a> FunctionLog<'a> {
    pub fn new(sink: &'a dyn LogSink, function_id: &'a str) -> Self {
        Self { sink, function_id }
    }

    pub fn debug(&self, message: impl AsRef<str>) {
        self.sink.log(Level::Debug, self.function_id, message.as_ref());
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.sink.log(Level::Info, self.function_id, message.as_ref());
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.sink.log(Level::Warn, self.function_id, message.as_ref());
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.sink.log(Level::Error, self.function_id, message.as_ref());
    }
}

impl fmt::Debug for FunctionLog<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionLog")
            .field("function_id", &self.function_id)
            .finish()
    }
}
