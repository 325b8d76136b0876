//! Replaying buffered entries into a real sink.

use serde::Serialize;
use tracing::debug;

use crate::composite::CompositeScope;
use crate::entry::LogEntry;
use crate::error::{DeferredLogError, DeferredResult};
use crate::queue::LogQueue;
use crate::sink::LogSink;

/// Outcome of a completed flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FlushReport {
    /// Entries replayed into the sink.
    pub replayed: usize,
}

/// How far a failed replay got.
struct ReplayFailure {
    /// Whether `sink.log` succeeded before the failure.
    delivered: bool,
    error: DeferredLogError,
}

impl LogQueue {
    /// Drain the queue into `sink`, oldest entry first.
    ///
    /// Each entry's scopes are reopened on the sink outermost first, the entry
    /// is logged, and the scopes are closed innermost first. Entries appended
    /// while the flush runs are drained too. Concurrent flushes of the same
    /// queue run one after the other.
    ///
    /// An entry leaves the queue only once the sink has logged it, so an entry
    /// whose scope or log call fails stays buffered for the next flush.
    ///
    /// # Errors
    ///
    /// Returns [`DeferredLogError::FlushInterrupted`] wrapping the first sink
    /// or teardown failure. Returns [`DeferredLogError::InvalidArgument`]
    /// without touching the queue when called from a sink on the thread that
    /// is already flushing this queue.
    pub fn flush<S: LogSink + ?Sized>(&self, sink: &S) -> DeferredResult<FlushReport> {
        let _serial = self.lock_flush()?;
        let mut report = FlushReport::default();

        while let Some(entry) = self.front() {
            let outcome = replay(sink, &entry);
            let delivered = match &outcome {
                Ok(()) => true,
                Err(failure) => failure.delivered,
            };
            if delivered {
                self.pop_front();
                report.replayed = report.replayed.saturating_add(1);
            }
            if let Err(failure) = outcome {
                debug!(
                    replayed = report.replayed,
                    delivered = failure.delivered,
                    error = %failure.error,
                    "Deferred log flush interrupted"
                );
                return Err(DeferredLogError::FlushInterrupted {
                    replayed: report.replayed,
                    source: Box::new(failure.error),
                });
            }
        }

        debug!(replayed = report.replayed, "Flushed deferred log entries");
        Ok(report)
    }
}

/// Drain `queue` into `sink`. See [`LogQueue::flush`].
///
/// # Errors
///
/// Returns [`DeferredLogError::FlushInterrupted`] if the sink fails, or
/// [`DeferredLogError::InvalidArgument`] if the flush is re-entered.
pub fn flush<S: LogSink + ?Sized>(queue: &LogQueue, sink: &S) -> DeferredResult<FlushReport> {
    queue.flush(sink)
}

fn replay<S: LogSink + ?Sized>(sink: &S, entry: &LogEntry) -> Result<(), ReplayFailure> {
    let scopes = if entry.has_scopes() {
        CompositeScope::open(sink, &entry.scopes).map_err(|error| ReplayFailure {
            delivered: false,
            error,
        })?
    } else {
        CompositeScope::new()
    };

    if let Err(e) = sink.log(entry.level, &entry.message, &entry.args) {
        let teardown = match scopes.close() {
            Err(DeferredLogError::PartialTeardown { failures, .. }) => failures,
            _ => Vec::new(),
        };
        return Err(ReplayFailure {
            delivered: false,
            error: DeferredLogError::sink_with_teardown(e, teardown),
        });
    }

    scopes.close().map_err(|error| ReplayFailure {
        delivered: true,
        error,
    })
}
