//! Shared FIFO of buffered log entries.

use std::collections::VecDeque;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError, TryLockError};
use std::thread::{self, ThreadId};
use tracing::trace;

use crate::entry::LogEntry;
use crate::error::{DeferredLogError, DeferredResult};

static GLOBAL_QUEUE: LazyLock<LogQueue> = LazyLock::new(LogQueue::new);

/// Unbounded, in-memory FIFO of deferred log entries.
///
/// Any number of producers may append concurrently. Entries leave the queue
/// only through [`LogQueue::flush`], strictly in append order. Clones share
/// the same underlying queue.
#[derive(Debug, Clone, Default)]
pub struct LogQueue {
    inner: Arc<QueueInner>,
}

#[derive(Debug, Default)]
struct QueueInner {
    entries: Mutex<VecDeque<Arc<LogEntry>>>,
    /// Held for the duration of a flush.
    flush_lock: Mutex<()>,
    /// Thread currently holding `flush_lock`.
    flusher: Mutex<Option<ThreadId>>,
}

/// Exclusive right to flush a queue. Clears the flusher on drop, then unlocks.
pub(crate) struct FlushGuard<'a> {
    queue: &'a LogQueue,
    _serial: MutexGuard<'a, ()>,
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        *self.queue.flusher() = None;
    }
}

impl LogQueue {
    /// Create a new, empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide queue.
    #[must_use]
    pub fn global() -> Self {
        GLOBAL_QUEUE.clone()
    }

    /// Append an entry.
    pub fn push(&self, entry: LogEntry) {
        let level = entry.level;
        let queued = {
            let mut entries = self.entries();
            entries.push_back(Arc::new(entry));
            entries.len()
        };
        trace!(%level, queued, "Deferred log entry queued");
    }

    /// Number of buffered entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Copy of the buffered entries in queue order. Does not dequeue.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<LogEntry>> {
        self.entries().iter().cloned().collect()
    }

    /// Whether two handles refer to the same queue.
    #[must_use]
    pub fn same_queue(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn front(&self) -> Option<Arc<LogEntry>> {
        self.entries().front().cloned()
    }

    pub(crate) fn pop_front(&self) -> Option<Arc<LogEntry>> {
        self.entries().pop_front()
    }

    /// Wait for any other flusher to finish, then take the flush lock.
    ///
    /// Fails instead of blocking when the calling thread is itself the one
    /// flushing, which happens when a sink flushes the queue it is fed from.
    pub(crate) fn lock_flush(&self) -> DeferredResult<FlushGuard<'_>> {
        let me = thread::current().id();
        let serial = match self.inner.flush_lock.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                if *self.flusher() == Some(me) {
                    return Err(DeferredLogError::InvalidArgument(
                        "flush re-entered from its own sink".to_string(),
                    ));
                }
                self.inner
                    .flush_lock
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
            },
        };
        *self.flusher() = Some(me);
        Ok(FlushGuard {
            queue: self,
            _serial: serial,
        })
    }

    fn flusher(&self) -> MutexGuard<'_, Option<ThreadId>> {
        self.inner
            .flusher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn entries(&self) -> MutexGuard<'_, VecDeque<Arc<LogEntry>>> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Severity;

    fn entry(message: &str) -> LogEntry {
        LogEntry::new(Severity::Information, message, Vec::new(), Vec::new())
    }

    #[test]
    fn test_push_preserves_order() {
        let queue = LogQueue::new();
        queue.push(entry("one"));
        queue.push(entry("two"));

        let messages: Vec<_> = queue
            .snapshot()
            .iter()
            .map(|e| e.message.clone())
            .collect();
        assert_eq!(messages, vec!["one", "two"]);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_clones_share_state() {
        let queue = LogQueue::new();
        let other = queue.clone();
        other.push(entry("shared"));

        assert!(queue.same_queue(&other));
        assert_eq!(queue.len(), 1);
        assert!(!queue.same_queue(&LogQueue::new()));
    }

    #[test]
    fn test_flush_lock_rejects_same_thread() {
        let queue = LogQueue::new();
        let guard = queue.lock_flush().unwrap();

        let err = queue.lock_flush().err().unwrap();
        assert!(matches!(err, DeferredLogError::InvalidArgument(_)));

        drop(guard);
        assert!(queue.lock_flush().is_ok());
    }

    #[test]
    fn test_flush_lock_blocks_other_threads() {
        let queue = LogQueue::new();
        let guard = queue.lock_flush().unwrap();

        let waiter = {
            let queue = queue.clone();
            std::thread::spawn(move || queue.lock_flush().is_ok())
        };
        std::thread::sleep(std::time::Duration::from_millis(20));
        assert!(!waiter.is_finished());

        drop(guard);
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn test_global_is_shared() {
        assert!(LogQueue::global().same_queue(&LogQueue::global()));
    }

    #[test]
    fn test_concurrent_producers() {
        let queue = LogQueue::new();
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let queue = queue.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        queue.push(entry(&format!("{t}-{i}")));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = queue.snapshot();
        assert_eq!(snapshot.len(), 200);

        // Per-producer order is preserved.
        for t in 0..4 {
            let prefix = format!("{t}-");
            let seen: Vec<usize> = snapshot
                .iter()
                .filter_map(|e| e.message.strip_prefix(&prefix))
                .map(|i| i.parse().unwrap())
                .collect();
            assert_eq!(seen, (0..50).collect::<Vec<_>>());
        }
    }
}
