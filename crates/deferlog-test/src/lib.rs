//! deferlog Test - Shared test utilities for deferlog.
//!
//! This crate provides a recording [`LogSink`](deferlog::LogSink) with
//! failure injection and a helper for capturing `tracing` output.
//!
//! # Usage
//!
//! ```rust,ignore
//! use deferlog::{DeferredLogger, LogQueue};
//! use deferlog_test::{RecordingSink, SinkEvent};
//!
//! let queue = LogQueue::new();
//! DeferredLogger::new(queue.clone()).information("start", vec![]);
//!
//! let sink = RecordingSink::new();
//! queue.flush(&sink).unwrap();
//! assert_eq!(sink.events().len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod capture;
pub mod mocks;

pub use capture::*;
pub use mocks::*;
