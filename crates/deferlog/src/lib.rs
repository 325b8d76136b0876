//! deferlog - Buffer log entries until a real logger exists, then replay them.
//!
//! This crate provides:
//! - A [`DeferredLogger`] that queues entries together with the scopes active
//!   in the caller's logical context
//! - Logical-context scope stacks that follow tokio tasks across `.await`
//! - Ordered replay into any [`LogSink`], reopening each entry's scopes
//!   outermost first and closing them innermost first
//! - Non-destructive queries over the buffered entries
//! - A [`TracingSink`] and logging setup for handing off to `tracing`
//!
//! # Example
//!
//! ```rust,no_run
//! use deferlog::{DeferredLogger, LogConfig, LogFormat, LogQueue, install_and_flush};
//!
//! # fn main() -> Result<(), deferlog::DeferredLogError> {
//! let queue = LogQueue::new();
//! let logger = DeferredLogger::new(queue.clone());
//!
//! // Bootstrap: no subscriber yet.
//! let scope = logger.begin_scope("phase=config")?;
//! logger.information("reading settings", vec![]);
//! drop(scope);
//!
//! if queue.has_errors() {
//!     eprintln!("startup reported errors");
//! }
//!
//! // The real logger is ready: install it and replay.
//! let config = LogConfig::new("debug").with_format(LogFormat::Compact);
//! let report = install_and_flush(&config, &queue)?;
//! tracing::info!(replayed = report.replayed, "Startup log replayed");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod composite;
mod context;
mod entry;
mod error;
mod flush;
mod level;
mod logger;
mod logging;
mod query;
mod queue;
mod sink;
mod tracing_sink;

pub use composite::CompositeScope;
pub use context::{ScopeHandle, ScopeStack, in_new_context};
pub use entry::LogEntry;
pub use error::{DeferredLogError, DeferredResult, SinkError};
pub use flush::{FlushReport, flush};
pub use level::{ParseSeverityError, Severity};
pub use logger::DeferredLogger;
pub use logging::{LogConfig, LogFormat, LogTarget, install_and_flush, setup_logging};
pub use query::EntryQuery;
pub use queue::LogQueue;
pub use sink::{LogSink, SinkScope};
pub use tracing_sink::{REPLAY_TARGET, TracingSink};

pub use serde_json::Value;
