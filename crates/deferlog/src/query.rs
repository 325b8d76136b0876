//! Read-only inspection of buffered entries.
//!
//! Queries never dequeue. They observe the live queue, so results may change
//! between iterations if producers or a flush run concurrently.

use std::fmt;
use std::sync::Arc;

use crate::entry::LogEntry;
use crate::level::Severity;
use crate::queue::LogQueue;

type Projection<T> = Arc<dyn Fn(&LogEntry) -> Option<T> + Send + Sync>;

/// A lazy, restartable view over the buffered entries.
///
/// Nothing is read until [`EntryQuery::iter`] is called, and each call
/// re-scans the queue's current contents.
pub struct EntryQuery<T> {
    queue: LogQueue,
    project: Projection<T>,
}

impl<T> EntryQuery<T> {
    fn new(
        queue: LogQueue,
        project: impl Fn(&LogEntry) -> Option<T> + Send + Sync + 'static,
    ) -> Self {
        Self {
            queue,
            project: Arc::new(project),
        }
    }

    /// Scan the queue now, in buffer order.
    pub fn iter(&self) -> std::vec::IntoIter<T> {
        let entries = self.queue.entries();
        entries
            .iter()
            .filter_map(|entry| (self.project)(entry.as_ref()))
            .collect::<Vec<_>>()
            .into_iter()
    }

    /// Number of matching entries right now.
    #[must_use]
    pub fn count(&self) -> usize {
        self.iter().len()
    }
}

impl<T> Clone for EntryQuery<T> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
            project: Arc::clone(&self.project),
        }
    }
}

impl<T> fmt::Debug for EntryQuery<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryQuery")
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}

impl<T> IntoIterator for &EntryQuery<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T> IntoIterator for EntryQuery<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl LogQueue {
    /// Whether any buffered entry is at error level.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.has_entries(Severity::Error)
    }

    /// Messages of the buffered error entries.
    #[must_use]
    pub fn errors(&self) -> EntryQuery<String> {
        EntryQuery::new(self.clone(), |entry| {
            (entry.level == Severity::Error).then(|| entry.message.clone())
        })
    }

    /// Whether any buffered entry is at `level`.
    #[must_use]
    pub fn has_entries(&self, level: Severity) -> bool {
        self.entries().iter().any(|entry| entry.level == level)
    }

    /// Level and message of the buffered entries at `level`.
    #[must_use]
    pub fn entries_at(&self, level: Severity) -> EntryQuery<(Severity, String)> {
        EntryQuery::new(self.clone(), move |entry| {
            (entry.level == level).then(|| (entry.level, entry.message.clone()))
        })
    }

    /// Level and message of every buffered entry.
    #[must_use]
    pub fn all_entries(&self) -> EntryQuery<(Severity, String)> {
        EntryQuery::new(self.clone(), |entry| {
            Some((entry.level, entry.message.clone()))
        })
    }
}
