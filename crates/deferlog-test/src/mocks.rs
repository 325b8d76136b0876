//! Mock sinks for testing replay.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use deferlog::{LogSink, Severity, SinkError, SinkScope, Value};

/// One call observed by a [`RecordingSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    /// A scope was opened.
    BeginScope(Value),
    /// An entry was logged.
    Log {
        /// Entry severity.
        level: Severity,
        /// Entry message.
        message: String,
        /// Entry arguments.
        args: Vec<Value>,
    },
    /// A scope was closed (or a close was attempted and failed).
    CloseScope(Value),
}

impl SinkEvent {
    /// A `Log` event without arguments.
    #[must_use]
    pub fn log(level: Severity, message: impl Into<String>) -> Self {
        Self::Log {
            level,
            message: message.into(),
            args: Vec::new(),
        }
    }

    /// A `BeginScope` event for a string state.
    #[must_use]
    pub fn begin(state: impl Into<Value>) -> Self {
        Self::BeginScope(state.into())
    }

    /// A `CloseScope` event for a string state.
    #[must_use]
    pub fn close(state: impl Into<Value>) -> Self {
        Self::CloseScope(state.into())
    }
}

#[derive(Debug, Default)]
struct Failures {
    begin: HashSet<String>,
    log: HashSet<String>,
    close: HashSet<String>,
    no_scope: HashSet<String>,
}

/// A sink recording every call in order.
///
/// Uses `std::sync::Mutex` internally so it works from sync and async tests.
/// Clones share the same journal. Scope states and messages can be marked to
/// fail, keyed by the state's string form or the message text.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<SinkEvent>>>,
    failures: Arc<Mutex<Failures>>,
}

impl RecordingSink {
    /// Create an empty recording sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail `begin_scope` for `state`.
    #[must_use]
    pub fn failing_begin(self, state: impl Into<Value>) -> Self {
        self.with_failures(|f| f.begin.insert(key(&state.into())));
        self
    }

    /// Fail `log` for entries whose message is `message`.
    #[must_use]
    pub fn failing_log(self, message: impl Into<String>) -> Self {
        self.with_failures(|f| f.log.insert(message.into()));
        self
    }

    /// Fail closing the scope opened for `state`.
    #[must_use]
    pub fn failing_close(self, state: impl Into<Value>) -> Self {
        self.with_failures(|f| f.close.insert(key(&state.into())));
        self
    }

    /// Answer `begin_scope(state)` with the "no scope" sentinel.
    #[must_use]
    pub fn without_scope_for(self, state: impl Into<Value>) -> Self {
        self.with_failures(|f| f.no_scope.insert(key(&state.into())));
        self
    }

    /// Stop injecting any failure.
    pub fn heal(&self) {
        self.with_failures(|f| *f = Failures::default());
    }

    /// All recorded events, in call order.
    #[must_use]
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Messages of the recorded `Log` events, in call order.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Log { message, .. } => Some(message),
                _ => None,
            })
            .collect()
    }

    /// Clear the recorded events.
    pub fn clear(&self) {
        if let Ok(mut guard) = self.events.lock() {
            guard.clear();
        }
    }

    fn record(&self, event: SinkEvent) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event);
        }
    }

    fn with_failures<R>(&self, f: impl FnOnce(&mut Failures) -> R) -> Option<R> {
        self.failures.lock().ok().map(|mut g| f(&mut g))
    }

    fn fails(&self, check: impl FnOnce(&Failures) -> bool) -> bool {
        self.with_failures(|f| check(&*f)).unwrap_or(false)
    }
}

impl LogSink for RecordingSink {
    fn log(&self, level: Severity, message: &str, args: &[Value]) -> Result<(), SinkError> {
        if self.fails(|f| f.log.contains(message)) {
            return Err(SinkError::new(format!("log rejected: {message}")));
        }
        self.record(SinkEvent::Log {
            level,
            message: message.to_string(),
            args: args.to_vec(),
        });
        Ok(())
    }

    fn begin_scope(&self, state: &Value) -> Result<Option<Box<dyn SinkScope + '_>>, SinkError> {
        let name = key(state);
        if self.fails(|f| f.begin.contains(&name)) {
            return Err(SinkError::new(format!("begin rejected: {name}")));
        }
        self.record(SinkEvent::BeginScope(state.clone()));
        if self.fails(|f| f.no_scope.contains(&name)) {
            return Ok(None);
        }
        Ok(Some(Box::new(RecordedScope {
            sink: self.clone(),
            state: state.clone(),
        })))
    }
}

struct RecordedScope {
    sink: RecordingSink,
    state: Value,
}

impl SinkScope for RecordedScope {
    fn close(self: Box<Self>) -> Result<(), SinkError> {
        let RecordedScope { sink, state } = *self;
        let name = key(&state);
        sink.record(SinkEvent::CloseScope(state));
        if sink.fails(|f| f.close.contains(&name)) {
            return Err(SinkError::new(format!("close rejected: {name}")));
        }
        Ok(())
    }
}

fn key(state: &Value) -> String {
    match state {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_calls_in_order() {
        let sink = RecordingSink::new();
        let scope = sink.begin_scope(&Value::from("s")).unwrap().unwrap();
        sink.log(Severity::Warning, "inside", &[]).unwrap();
        scope.close().unwrap();

        assert_eq!(
            sink.events(),
            vec![
                SinkEvent::begin("s"),
                SinkEvent::log(Severity::Warning, "inside"),
                SinkEvent::close("s"),
            ]
        );
        assert_eq!(sink.messages(), vec!["inside"]);
    }

    #[test]
    fn test_failure_injection() {
        let sink = RecordingSink::new()
            .failing_begin("bad")
            .failing_log("nope")
            .failing_close("fragile")
            .without_scope_for("none");

        assert!(sink.begin_scope(&Value::from("bad")).is_err());
        assert!(sink.log(Severity::Error, "nope", &[]).is_err());
        assert!(sink.begin_scope(&Value::from("none")).unwrap().is_none());
        let fragile = sink.begin_scope(&Value::from("fragile")).unwrap().unwrap();
        assert!(fragile.close().is_err());

        sink.heal();
        assert!(sink.log(Severity::Error, "nope", &[]).is_ok());
    }
}
