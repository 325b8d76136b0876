//! The capability a real logger must offer to receive replayed entries.

use serde_json::Value;

use crate::error::SinkError;
use crate::level::Severity;

/// A destination for replayed log entries.
pub trait LogSink {
    /// Emit one entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink could not accept the entry.
    fn log(&self, level: Severity, message: &str, args: &[Value]) -> Result<(), SinkError>;

    /// Open a scope around subsequent `log` calls.
    ///
    /// `Ok(None)` means the sink does not track scopes; nothing needs closing.
    ///
    /// # Errors
    ///
    /// Returns an error if the scope could not be opened.
    fn begin_scope(&self, state: &Value) -> Result<Option<Box<dyn SinkScope + '_>>, SinkError>;
}

/// A scope opened on a [`LogSink`].
pub trait SinkScope {
    /// Close the scope.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink failed to close the scope.
    fn close(self: Box<Self>) -> Result<(), SinkError>;
}

impl<S: LogSink + ?Sized> LogSink for &S {
    fn log(&self, level: Severity, message: &str, args: &[Value]) -> Result<(), SinkError> {
        (**self).log(level, message, args)
    }

    fn begin_scope(&self, state: &Value) -> Result<Option<Box<dyn SinkScope + '_>>, SinkError> {
        (**self).begin_scope(state)
    }
}

impl<S: LogSink + ?Sized> LogSink for std::sync::Arc<S> {
    fn log(&self, level: Severity, message: &str, args: &[Value]) -> Result<(), SinkError> {
        (**self).log(level, message, args)
    }

    fn begin_scope(&self, state: &Value) -> Result<Option<Box<dyn SinkScope + '_>>, SinkError> {
        (**self).begin_scope(state)
    }
}
