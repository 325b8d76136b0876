//! A [`LogSink`] that replays into the `tracing` ecosystem.

use serde_json::Value;
use tracing::span::EnteredSpan;

use crate::error::SinkError;
use crate::level::Severity;
use crate::sink::{LogSink, SinkScope};

/// Target of every event and span emitted by [`TracingSink`].
pub const REPLAY_TARGET: &str = "deferlog::replay";

/// Replays entries as `tracing` events and scopes as entered spans.
///
/// Each scope becomes an `info`-level `deferred_scope` span carrying a
/// `scope` field. Each entry becomes an event at the matching level with the
/// JSON-encoded arguments in an `args` field. Critical entries are emitted at
/// `ERROR` with `critical = true`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TracingSink {
    /// Create a tracing sink.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl LogSink for TracingSink {
    fn log(&self, level: Severity, message: &str, args: &[Value]) -> Result<(), SinkError> {
        let args = Value::Array(args.to_vec());
        match level {
            Severity::Trace => tracing::trace!(target: REPLAY_TARGET, %args, "{message}"),
            Severity::Debug => tracing::debug!(target: REPLAY_TARGET, %args, "{message}"),
            Severity::Information => tracing::info!(target: REPLAY_TARGET, %args, "{message}"),
            Severity::Warning => tracing::warn!(target: REPLAY_TARGET, %args, "{message}"),
            Severity::Error => tracing::error!(target: REPLAY_TARGET, %args, "{message}"),
            Severity::Critical => {
                tracing::error!(target: REPLAY_TARGET, critical = true, %args, "{message}");
            },
        }
        Ok(())
    }

    fn begin_scope(&self, state: &Value) -> Result<Option<Box<dyn SinkScope + '_>>, SinkError> {
        let span = tracing::info_span!(
            target: REPLAY_TARGET,
            "deferred_scope",
            scope = %render_state(state)
        );
        Ok(Some(Box::new(SpanScope(span.entered()))))
    }
}

struct SpanScope(EnteredSpan);

impl SinkScope for SpanScope {
    fn close(self: Box<Self>) -> Result<(), SinkError> {
        let _span = self.0.exit();
        Ok(())
    }
}

/// Strings render bare; everything else renders as JSON.
fn render_state(state: &Value) -> String {
    match state {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
