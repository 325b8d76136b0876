//! Real-logger configuration and the bootstrap hand-off.
//!
//! Code running before [`setup_logging`] writes to a [`DeferredLogger`](crate::DeferredLogger).
//! Once the configuration is known, [`install_and_flush`] installs the
//! subscriber and replays everything buffered so far into it.

use serde::{Deserialize, Serialize};
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    filter::{Directive, ParseError},
    fmt::{self, writer::BoxMakeWriter},
    layer::{Layered, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::error::{DeferredLogError, DeferredResult};
use crate::flush::FlushReport;
use crate::queue::LogQueue;
use crate::tracing_sink::TracingSink;

type FilteredRegistry = Layered<EnvFilter, Registry>;

/// Output format of the real logger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, human-readable.
    #[default]
    Pretty,
    /// Single-line.
    Compact,
    /// Newline-delimited JSON.
    Json,
}

/// Where the real logger writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    /// Standard output.
    Stdout,
    /// Standard error.
    #[default]
    Stderr,
}

/// Configuration of the logger deferred entries are flushed into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Base filter, e.g. `info` or `debug`.
    #[serde(default = "default_level")]
    pub level: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
    /// Output stream.
    #[serde(default)]
    pub target: LogTarget,
    /// Whether to print timestamps.
    #[serde(default = "default_true")]
    pub timestamps: bool,
    /// Whether to use ANSI colors.
    #[serde(default = "default_true")]
    pub ansi: bool,
    /// Whether to print source file and line.
    #[serde(default)]
    pub file_info: bool,
    /// Extra filter directives, e.g. `deferlog::replay=trace`.
    #[serde(default)]
    pub directives: Vec<String>,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            target: LogTarget::default(),
            timestamps: true,
            ansi: true,
            file_info: false,
            directives: Vec::new(),
        }
    }
}

impl LogConfig {
    /// A config with the given base level.
    #[must_use]
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            ..Default::default()
        }
    }

    /// Set the output format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the output stream.
    #[must_use]
    pub fn with_target(mut self, target: LogTarget) -> Self {
        self.target = target;
        self
    }

    /// Add a filter directive.
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Disable timestamps.
    #[must_use]
    pub fn without_timestamps(mut self) -> Self {
        self.timestamps = false;
        self
    }

    /// Disable ANSI colors.
    #[must_use]
    pub fn without_ansi(mut self) -> Self {
        self.ansi = false;
        self
    }

    /// Print source file and line.
    #[must_use]
    pub fn with_file_info(mut self) -> Self {
        self.file_info = true;
        self
    }

    /// Build the env filter from the level and directives.
    ///
    /// # Errors
    ///
    /// Returns [`DeferredLogError::Config`] if the level or a directive does
    /// not parse.
    pub fn build_filter(&self) -> DeferredResult<EnvFilter> {
        let mut filter =
            EnvFilter::try_new(&self.level).map_err(|e| DeferredLogError::Config(e.to_string()))?;

        for directive in &self.directives {
            let directive: Directive = directive
                .parse()
                .map_err(|e: ParseError| DeferredLogError::Config(e.to_string()))?;
            filter = filter.add_directive(directive);
        }

        Ok(filter)
    }

    fn writer(&self) -> BoxMakeWriter {
        match self.target {
            LogTarget::Stdout => BoxMakeWriter::new(std::io::stdout),
            LogTarget::Stderr => BoxMakeWriter::new(std::io::stderr),
        }
    }

    fn build_layer(&self) -> Box<dyn Layer<FilteredRegistry> + Send + Sync> {
        let base = fmt::layer()
            .with_writer(self.writer())
            .with_ansi(self.ansi)
            .with_file(self.file_info)
            .with_line_number(self.file_info);

        match (self.format, self.timestamps) {
            (LogFormat::Pretty, true) => base.pretty().boxed(),
            (LogFormat::Pretty, false) => base.pretty().without_time().boxed(),
            (LogFormat::Compact, true) => base.compact().boxed(),
            (LogFormat::Compact, false) => base.compact().without_time().boxed(),
            (LogFormat::Json, true) => base.json().boxed(),
            (LogFormat::Json, false) => base.json().without_time().boxed(),
        }
    }
}

/// Install the global `tracing` subscriber described by `config`.
///
/// # Errors
///
/// Returns [`DeferredLogError::Config`] for an invalid filter and
/// [`DeferredLogError::Init`] if a global subscriber is already installed.
pub fn setup_logging(config: &LogConfig) -> DeferredResult<()> {
    let filter = config.build_filter()?;
    tracing_subscriber::registry()
        .with(filter)
        .with(config.build_layer())
        .try_init()
        .map_err(|e| DeferredLogError::Init(e.to_string()))
}

/// Install the real logger, then replay everything buffered in `queue` into it.
///
/// # Errors
///
/// Returns the setup error if the subscriber cannot be installed, in which
/// case the queue is left untouched, or the flush error if replay fails.
pub fn install_and_flush(config: &LogConfig, queue: &LogQueue) -> DeferredResult<FlushReport> {
    setup_logging(config)?;
    queue.flush(&TracingSink::new())
}
