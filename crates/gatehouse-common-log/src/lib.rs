//! Logging infrastructure for Gatehouse.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Environment variable prefix shared by every logging knob.
pub const ENV_PREFIX: &str = "GATEHOUSE_LOG";

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level.
    pub level: LogLevel,
    /// Output format.
    pub format: LogFormat,
    /// Log file path (if file logging enabled).
    pub file_path: Option<PathBuf>,
    /// Include source location.
    pub source_location: bool,
    /// Include span open/close events.
    pub span_events: bool,
}

/// Log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing_subscriber::filter::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing_subscriber::filter::LevelFilter::TRACE,
            LogLevel::Debug => tracing_subscriber::filter::LevelFilter::DEBUG,
            LogLevel::Info => tracing_subscriber::filter::LevelFilter::INFO,
            LogLevel::Warn => tracing_subscriber::filter::LevelFilter::WARN,
            LogLevel::Error => tracing_subscriber::filter::LevelFilter::ERROR,
        }
    }
}

impl LogLevel {
    /// Parse from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    fn as_directive(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable pretty format.
    #[default]
    Pretty,
    /// Compact single-line format.
    Compact,
    /// JSON structured format.
    Json,
}

impl LogFormat {
    /// Parse from string, falling back to pretty output.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            "compact" => Self::Compact,
            _ => Self::Pretty,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            format: LogFormat::default(),
            file_path: None,
            source_location: false,
            span_events: false,
        }
    }
}

fn env_flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

impl LogConfig {
    /// Create config from `GATEHOUSE_LOG_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        let level = std::env::var(format!("{ENV_PREFIX}_LEVEL"))
            .or_else(|_| std::env::var("RUST_LOG"))
            .ok();
        if let Some(level) = level.as_deref().and_then(LogLevel::parse) {
            config.level = level;
        }

        if let Ok(format) = std::env::var(format!("{ENV_PREFIX}_FORMAT")) {
            config.format = LogFormat::parse(&format);
        }

        if let Ok(file_path) = std::env::var(format!("{ENV_PREFIX}_FILE")) {
            config.file_path = Some(PathBuf::from(file_path));
        }

        if let Ok(source_location) = std::env::var(format!("{ENV_PREFIX}_SOURCE")) {
            config.source_location = env_flag(&source_location);
        }

        if let Ok(span_events) = std::env::var(format!("{ENV_PREFIX}_SPANS")) {
            config.span_events = env_flag(&span_events);
        }

        config
    }

    /// Override level and format from textual settings, e.g. a config file.
    pub fn with_overrides(mut self, level: &str, format: &str) -> Self {
        if let Some(level) = LogLevel::parse(level) {
            self.level = level;
        }
        self.format = LogFormat::parse(format);
        self
    }

    fn span_events(&self) -> FmtSpan {
        if self.span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }
}

/// Initialize logging with the given configuration.
///
/// Only one of the stderr layers is active; the file layer mirrors the chosen
/// format without ANSI colouring.
pub fn init(config: LogConfig) -> Result<(), LogError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_directive()));

    let file = match &config.file_path {
        Some(path) => Some(Arc::new(
            std::fs::OpenOptions::new().create(true).append(true).open(path)?,
        )),
        None => None,
    };

    let pretty = (config.format == LogFormat::Pretty).then(|| {
        fmt::layer()
            .with_ansi(true)
            .with_target(true)
            .with_file(config.source_location)
            .with_line_number(config.source_location)
            .with_span_events(config.span_events())
    });
    let compact = (config.format == LogFormat::Compact).then(|| {
        fmt::layer()
            .compact()
            .with_ansi(true)
            .with_span_events(config.span_events())
    });
    let json = (config.format == LogFormat::Json)
        .then(|| fmt::layer().json().with_span_events(config.span_events()));

    let file_text = file
        .clone()
        .filter(|_| config.format != LogFormat::Json)
        .map(|file| {
            fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .with_target(true)
                .with_file(config.source_location)
                .with_line_number(config.source_location)
                .with_span_events(config.span_events())
        });
    let file_json = file
        .filter(|_| config.format == LogFormat::Json)
        .map(|file| {
            fmt::layer()
                .json()
                .with_writer(file)
                .with_span_events(config.span_events())
        });

    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(compact)
        .with(json)
        .with(file_text)
        .with(file_json)
        .try_init()
        .map_err(|e| LogError::InitError(e.to_string()))
}

/// Logging errors.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("failed to initialize logging: {0}")]
    InitError(String),

    #[error("failed to open log file: {0}")]
    FileError(#[from] io::Error),
}

/// Convenience macros re-exported from tracing.
pub use tracing::{debug, error, info, trace, warn};

/// Span helpers for authorization flows.
pub mod spans;
