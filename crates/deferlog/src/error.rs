//! Deferred logging error types.

use thiserror::Error;

/// Error reported by a [`LogSink`](crate::LogSink) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SinkError {
    message: String,
}

impl SinkError {
    /// Create a sink error with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors that can occur while buffering or replaying deferred log entries.
#[derive(Debug, Error)]
pub enum DeferredLogError {
    /// A required argument was missing or null.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The sink rejected a `log` or `begin_scope` call.
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    /// A sink call failed, and closing the scopes already opened for the same
    /// entry failed too.
    #[error("sink error: {source}; {} scope(s) also failed to close", .teardown.len())]
    SinkWithTeardown {
        /// The failed `log` or `begin_scope` call.
        source: SinkError,
        /// Close failures of the opened scopes, innermost first.
        teardown: Vec<SinkError>,
    },

    /// One or more sink scopes failed to close. Every close was attempted.
    #[error("{} of {attempted} scope(s) failed to close", .failures.len())]
    PartialTeardown {
        /// Number of scopes whose close was attempted.
        attempted: usize,
        /// The individual close failures, innermost scope first.
        failures: Vec<SinkError>,
    },

    /// A flush stopped before the queue was drained.
    #[error("flush interrupted after {replayed} entries: {source}")]
    FlushInterrupted {
        /// Entries successfully replayed before the failure.
        replayed: usize,
        /// What stopped the flush.
        #[source]
        source: Box<DeferredLogError>,
    },

    /// Logging configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Logging initialization error.
    #[error("initialization error: {0}")]
    Init(String),
}

impl DeferredLogError {
    /// A sink failure, carrying any close failures from the cleanup after it.
    pub(crate) fn sink_with_teardown(source: SinkError, teardown: Vec<SinkError>) -> Self {
        if teardown.is_empty() {
            Self::Sink(source)
        } else {
            Self::SinkWithTeardown { source, teardown }
        }
    }
}

/// Result type for deferred logging operations.
pub type DeferredResult<T> = Result<T, DeferredLogError>;
