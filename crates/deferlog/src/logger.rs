//! The deferred logger: buffers log calls with their active scopes.

use serde_json::Value;

use crate::context::{ScopeHandle, ScopeStack};
use crate::entry::LogEntry;
use crate::error::DeferredResult;
use crate::level::Severity;
use crate::queue::LogQueue;

/// Logger that queues entries for later replay instead of emitting them.
///
/// Use it during startup, before the real logging stack is configured. Each
/// call captures the scopes active in the caller's logical context and
/// appends a [`LogEntry`] to the logger's [`LogQueue`].
///
/// # Example
///
/// ```rust
/// use deferlog::{DeferredLogger, LogQueue};
///
/// # fn main() -> deferlog::DeferredResult<()> {
/// let queue = LogQueue::new();
/// let logger = DeferredLogger::new(queue.clone());
///
/// logger.information("loading configuration", vec![]);
/// let scope = logger.begin_scope("request=42")?;
/// logger.warning("slow", vec![]);
/// drop(scope);
///
/// assert_eq!(queue.len(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct DeferredLogger {
    queue: LogQueue,
    context: Option<ScopeStack>,
}

impl DeferredLogger {
    /// Create a logger appending to `queue`, using the ambient logical context.
    #[must_use]
    pub fn new(queue: LogQueue) -> Self {
        Self {
            queue,
            context: None,
        }
    }

    /// Create a logger appending to the process-wide queue.
    #[must_use]
    pub fn global() -> Self {
        Self::new(LogQueue::global())
    }

    /// A logger sharing this queue but pinned to an explicit logical context.
    #[must_use]
    pub fn bound_to(&self, context: ScopeStack) -> Self {
        Self {
            queue: self.queue.clone(),
            context: Some(context),
        }
    }

    /// The queue this logger appends to.
    #[must_use]
    pub fn queue(&self) -> &LogQueue {
        &self.queue
    }

    /// The logical context scopes are tracked in.
    #[must_use]
    pub fn context(&self) -> ScopeStack {
        self.context.clone().unwrap_or_else(ScopeStack::current)
    }

    /// Begin a scope in the logger's logical context.
    ///
    /// # Errors
    ///
    /// Returns [`DeferredLogError::InvalidArgument`](crate::DeferredLogError::InvalidArgument)
    /// if `state` is null.
    pub fn begin_scope(&self, state: impl Into<Value>) -> DeferredResult<ScopeHandle> {
        self.context().begin(state)
    }

    /// Queue an entry at `level`.
    pub fn log(&self, level: Severity, message: impl Into<String>, args: Vec<Value>) {
        let scopes = self.context().snapshot();
        self.queue.push(LogEntry::new(level, message, args, scopes));
    }

    /// Queue a trace entry.
    pub fn trace(&self, message: impl Into<String>, args: Vec<Value>) {
        self.log(Severity::Trace, message, args);
    }

    /// Queue a debug entry.
    pub fn debug(&self, message: impl Into<String>, args: Vec<Value>) {
        self.log(Severity::Debug, message, args);
    }

    /// Queue an information entry.
    pub fn information(&self, message: impl Into<String>, args: Vec<Value>) {
        self.log(Severity::Information, message, args);
    }

    /// Queue a warning entry.
    pub fn warning(&self, message: impl Into<String>, args: Vec<Value>) {
        self.log(Severity::Warning, message, args);
    }

    /// Queue an error entry.
    pub fn error(&self, message: impl Into<String>, args: Vec<Value>) {
        self.log(Severity::Error, message, args);
    }

    /// Queue a critical entry.
    pub fn critical(&self, message: impl Into<String>, args: Vec<Value>) {
        self.log(Severity::Critical, message, args);
    }
}

/// Queue an entry on a [`DeferredLogger`], converting each argument with
/// `Value::from`.
///
/// ```rust
/// use deferlog::{DeferredLogger, LogQueue, Severity, deferred_log};
///
/// let logger = DeferredLogger::new(LogQueue::new());
/// deferred_log!(logger, Severity::Warning, "retrying {Host} in {Secs}s", "db-1", 5);
/// assert_eq!(logger.queue().snapshot()[0].args.len(), 2);
/// ```
#[macro_export]
macro_rules! deferred_log {
    ($logger:expr, $level:expr, $message:expr $(, $arg:expr)* $(,)?) => {
        $logger.log(
            $level,
            $message,
            ::std::vec![$($crate::Value::from($arg)),*],
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_each_level_is_queued() {
        let logger = DeferredLogger::new(LogQueue::new()).bound_to(ScopeStack::new());
        logger.trace("t", vec![]);
        logger.debug("d", vec![]);
        logger.information("i", vec![]);
        logger.warning("w", vec![]);
        logger.error("e", vec![]);
        logger.critical("c", vec![]);

        let levels: Vec<_> = logger.queue().snapshot().iter().map(|e| e.level).collect();
        assert_eq!(levels, Severity::ALL.to_vec());
    }

    #[test]
    fn test_captures_scopes_outermost_first() {
        let logger = DeferredLogger::new(LogQueue::new()).bound_to(ScopeStack::new());
        let _outer = logger.begin_scope("S1").unwrap();
        let _inner = logger.begin_scope(json!({"id": 2})).unwrap();
        logger.error("x", vec![json!("arg")]);

        let entry = &logger.queue().snapshot()[0];
        assert_eq!(entry.scopes, vec![json!("S1"), json!({"id": 2})]);
        assert_eq!(entry.args, vec![json!("arg")]);
    }

    #[test]
    fn test_released_scope_not_captured() {
        let logger = DeferredLogger::new(LogQueue::new()).bound_to(ScopeStack::new());
        let scope = logger.begin_scope("gone").unwrap();
        scope.close();
        logger.information("", vec![]);

        let entry = &logger.queue().snapshot()[0];
        assert!(entry.scopes.is_empty());
        assert!(entry.message.is_empty());
    }

    #[test]
    fn test_null_scope_rejected() {
        let logger = DeferredLogger::new(LogQueue::new());
        assert!(logger.begin_scope(Value::Null).is_err());
    }

    #[test]
    fn test_bound_loggers_are_isolated() {
        let queue = LogQueue::new();
        let a = DeferredLogger::new(queue.clone()).bound_to(ScopeStack::new());
        let b = a.bound_to(ScopeStack::new());

        let _scope = a.begin_scope("only-a").unwrap();
        a.information("from a", vec![]);
        b.information("from b", vec![]);

        let snapshot = queue.snapshot();
        assert_eq!(snapshot[0].scopes, vec![json!("only-a")]);
        assert!(snapshot[1].scopes.is_empty());
    }

    #[test]
    fn test_macro_converts_args() {
        let logger = DeferredLogger::new(LogQueue::new());
        deferred_log!(logger, Severity::Debug, "{A} {B} {C}", "x", 7, true);
        deferred_log!(logger, Severity::Debug, "no args");

        let snapshot = logger.queue().snapshot();
        assert_eq!(snapshot[0].args, vec![json!("x"), json!(7), json!(true)]);
        assert!(snapshot[1].args.is_empty());
    }
}
