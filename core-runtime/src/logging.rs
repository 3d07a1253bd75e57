//! # Structured logging
//!
//! Installs a `tracing-subscriber` registry for a worker or CLI process.
//! Workspace crates log at the configured level while chatty dependencies
//! (`hyper`, `reqwest`, `sqlx`) are held at `warn`. In JSON output the
//! enclosing spans are included, so every event carries the pid and action of
//! the job that produced it.
//!
//! ```ignore
//! use core_runtime::logging::{init_logging, LoggingConfig};
//!
//! init_logging(LoggingConfig::from_env()?)?;
//! tracing::info!("Worker started");
//! ```

use crate::error::{Error, Result};
use std::str::FromStr;
use tracing_subscriber::{
    filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry,
};

const WORKSPACE_CRATES: &[&str] = &[
    "repo_indexer",
    "indexer_worker",
    "indexer_queue",
    "bridge_desktop",
    "core_runtime",
    "core_storage",
    "core_metadata",
    "core_sync",
];

const QUIET_DEPENDENCIES: &[&str] = &["h2", "hyper", "reqwest", "sqlx"];

/// Output encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, coloured; for a terminal
    Pretty,
    /// One JSON object per line; for log shipping
    Json,
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            other => Err(Error::Config(format!("Unknown log format: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(Error::Config(format!("Unknown log level: {}", other))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Level applied to workspace crates when no explicit filter is set
    pub level: LogLevel,
    /// Full `EnvFilter` directive string; replaces the per-crate defaults
    pub filter: Option<String>,
    /// Attach the current span and its parents to JSON events
    pub include_spans: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            filter: None,
            include_spans: true,
        }
    }
}

impl LoggingConfig {
    /// Defaults overridden by `LOG_FORMAT`, `LOG_LEVEL` and `RUST_LOG`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            config.format = format.parse()?;
        }
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.level = level.parse()?;
        }
        config.filter = std::env::var("RUST_LOG")
            .ok()
            .filter(|directives| !directives.trim().is_empty());
        Ok(config)
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_filter(mut self, directives: impl Into<String>) -> Self {
        self.filter = Some(directives.into());
        self
    }

    pub fn with_spans(mut self, include: bool) -> Self {
        self.include_spans = include;
        self
    }

    fn directives(&self) -> String {
        if let Some(custom) = &self.filter {
            return custom.clone();
        }
        let level = self.level.as_str();
        WORKSPACE_CRATES
            .iter()
            .map(|krate| format!("{}={}", krate, level))
            .chain(QUIET_DEPENDENCIES.iter().map(|dep| format!("{}=warn", dep)))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = build_filter(&config)?;

    let output: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Pretty => fmt::layer().pretty().with_writer(std::io::stdout).boxed(),
        LogFormat::Compact => fmt::layer().compact().with_writer(std::io::stdout).boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(config.include_spans)
            .with_span_list(config.include_spans)
            .with_writer(std::io::stdout)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(output)
        .with(filter)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    EnvFilter::try_new(config.directives())
        .map_err(|e| Error::Config(format!("Invalid log filter: {}", e)))
}
