//! Prelude module - commonly used types for convenient import.
//!
//! Use `use deferlog::prelude::*;` to import all essential types.
//!
//! # Example
//!
//! ```rust
//! use deferlog::prelude::*;
//!
//! # fn main() -> DeferredResult<()> {
//! let queue = LogQueue::new();
//! let logger = DeferredLogger::new(queue.clone());
//! logger.error("database unreachable", vec![]);
//!
//! assert!(queue.has_errors());
//! assert_eq!(queue.errors().iter().collect::<Vec<_>>(), vec!["database unreachable"]);
//! # Ok(())
//! # }
//! ```

// Errors
pub use crate::{DeferredLogError, DeferredResult, SinkError};

// Buffering
pub use crate::{DeferredLogger, LogEntry, LogQueue, Severity};

// Scopes
pub use crate::{ScopeHandle, ScopeStack};

// Replay
pub use crate::{FlushReport, LogSink, SinkScope, TracingSink};

// Logging setup
pub use crate::{LogConfig, LogFormat, LogTarget, install_and_flush, setup_logging};
