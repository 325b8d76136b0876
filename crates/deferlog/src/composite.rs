//! Nested sink scopes released as one unit.

use serde_json::Value;
use tracing::warn;

use crate::error::{DeferredLogError, DeferredResult, SinkError};
use crate::sink::{LogSink, SinkScope};

/// A chain of opened sink scopes, outermost first.
///
/// Closing releases the scopes innermost first. Every close is attempted even
/// when an earlier one fails. Dropping an unclosed composite closes what is
/// left and logs any failures.
#[must_use = "a CompositeScope should be closed to observe teardown failures"]
pub struct CompositeScope<'a> {
    scopes: Vec<Box<dyn SinkScope + 'a>>,
}

impl<'a> CompositeScope<'a> {
    /// An empty composite.
    pub fn new() -> Self {
        Self { scopes: Vec::new() }
    }

    /// Open each state on `sink`, outermost first.
    ///
    /// Sinks answering `None` contribute nothing to the composite.
    ///
    /// # Errors
    ///
    /// Returns [`DeferredLogError::Sink`] if any scope fails to open. Scopes
    /// opened before the failure are closed first; if any of those closes
    /// fail, the error is [`DeferredLogError::SinkWithTeardown`] instead.
    pub fn open<S: LogSink + ?Sized>(sink: &'a S, states: &[Value]) -> DeferredResult<Self> {
        let mut composite = Self::new();
        for state in states {
            match sink.begin_scope(state) {
                Ok(Some(scope)) => composite.push(scope),
                Ok(None) => {},
                Err(e) => {
                    let failures = composite.release_all();
                    return Err(DeferredLogError::sink_with_teardown(e, failures));
                },
            }
        }
        Ok(composite)
    }

    /// Add an opened scope as the new innermost.
    pub fn push(&mut self, scope: Box<dyn SinkScope + 'a>) {
        self.scopes.push(scope);
    }

    /// Number of scopes still open.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// Whether no scope is open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Close every scope, innermost first.
    ///
    /// # Errors
    ///
    /// Returns [`DeferredLogError::PartialTeardown`] listing each failed close.
    pub fn close(mut self) -> DeferredResult<()> {
        let attempted = self.scopes.len();
        let failures = self.release_all();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(DeferredLogError::PartialTeardown {
                attempted,
                failures,
            })
        }
    }

    fn release_all(&mut self) -> Vec<SinkError> {
        let mut failures = Vec::new();
        while let Some(scope) = self.scopes.pop() {
            if let Err(e) = scope.close() {
                failures.push(e);
            }
        }
        failures
    }
}

impl Default for CompositeScope<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CompositeScope<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeScope")
            .field("open", &self.scopes.len())
            .finish()
    }
}

impl Drop for CompositeScope<'_> {
    fn drop(&mut self) {
        let failures = self.release_all();
        log_teardown_failures(&failures);
    }
}

fn log_teardown_failures(failures: &[SinkError]) {
    for failure in failures {
        warn!(error = %failure, "Failed to close replayed log scope");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Severity;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Journal {
        events: Mutex<Vec<String>>,
        fail_close: Option<&'static str>,
        fail_begin: Option<&'static str>,
        no_scope: Option<&'static str>,
    }

    impl Journal {
        fn record(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    struct JournalScope<'a> {
        journal: &'a Journal,
        name: String,
    }

    impl SinkScope for JournalScope<'_> {
        fn close(self: Box<Self>) -> Result<(), SinkError> {
            self.journal.record(format!("close {}", self.name));
            if self.journal.fail_close == Some(self.name.as_str()) {
                return Err(SinkError::new(format!("cannot close {}", self.name)));
            }
            Ok(())
        }
    }

    impl LogSink for Journal {
        fn log(&self, level: Severity, message: &str, _args: &[Value]) -> Result<(), SinkError> {
            self.record(format!("log {level} {message}"));
            Ok(())
        }

        fn begin_scope(
            &self,
            state: &Value,
        ) -> Result<Option<Box<dyn SinkScope + '_>>, SinkError> {
            let name = state.as_str().unwrap_or_default().to_string();
            if self.fail_begin == Some(name.as_str()) {
                return Err(SinkError::new(format!("cannot open {name}")));
            }
            self.record(format!("begin {name}"));
            if self.no_scope == Some(name.as_str()) {
                return Ok(None);
            }
            Ok(Some(Box::new(JournalScope {
                journal: self,
                name,
            })))
        }
    }

    #[test]
    fn test_closes_in_reverse_order() {
        let journal = Journal::default();
        let composite = CompositeScope::open(&journal, &[json!("S1"), json!("S2")]).unwrap();
        assert_eq!(composite.len(), 2);
        composite.close().unwrap();

        assert_eq!(
            journal.events(),
            vec!["begin S1", "begin S2", "close S2", "close S1"]
        );
    }

    #[test]
    fn test_failed_close_still_closes_outer() {
        let journal = Journal {
            fail_close: Some("S2"),
            ..Journal::default()
        };
        let composite = CompositeScope::open(&journal, &[json!("S1"), json!("S2")]).unwrap();

        let err = composite.close().unwrap_err();
        match err {
            DeferredLogError::PartialTeardown {
                attempted,
                failures,
            } => {
                assert_eq!(attempted, 2);
                assert_eq!(failures, vec![SinkError::new("cannot close S2")]);
            },
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(journal.events().last().map(String::as_str), Some("close S1"));
    }

    #[test]
    fn test_failed_open_closes_opened_scopes() {
        let journal = Journal {
            fail_begin: Some("S2"),
            ..Journal::default()
        };
        let err = CompositeScope::open(&journal, &[json!("S1"), json!("S2")]).unwrap_err();

        assert!(matches!(err, DeferredLogError::Sink(_)));
        assert_eq!(journal.events(), vec!["begin S1", "close S1"]);
    }

    #[test]
    fn test_failed_open_reports_teardown_failures() {
        let journal = Journal {
            fail_begin: Some("S3"),
            fail_close: Some("S2"),
            ..Journal::default()
        };
        let err =
            CompositeScope::open(&journal, &[json!("S1"), json!("S2"), json!("S3")]).unwrap_err();

        match err {
            DeferredLogError::SinkWithTeardown { source, teardown } => {
                assert_eq!(source, SinkError::new("cannot open S3"));
                assert_eq!(teardown, vec![SinkError::new("cannot close S2")]);
            },
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(
            journal.events(),
            vec!["begin S1", "begin S2", "close S2", "close S1"]
        );
    }

    #[test]
    fn test_no_scope_sentinel_is_skipped() {
        let journal = Journal {
            no_scope: Some("S1"),
            ..Journal::default()
        };
        let composite = CompositeScope::open(&journal, &[json!("S1"), json!("S2")]).unwrap();
        assert_eq!(composite.len(), 1);
        composite.close().unwrap();

        assert_eq!(journal.events(), vec!["begin S1", "begin S2", "close S2"]);
    }

    #[test]
    fn test_drop_closes_remaining() {
        let journal = Journal::default();
        {
            let _composite = CompositeScope::open(&journal, &[json!("S1")]).unwrap();
        }
        assert_eq!(journal.events(), vec!["begin S1", "close S1"]);
    }
}
