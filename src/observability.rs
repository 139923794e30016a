//! Observability Bootstrap (AU-2, AU-12)
//!
//! Tracing-subscriber initialization for hosts embedding the auth core.
//! Application code (this crate included) uses standard `tracing` macros
//! and the [`security_event!`](crate::security_event) macro; the host picks
//! the output format once at startup.
//!
//! # Usage
//!
//! ```ignore
//! use portcullis::observability::{self, ObservabilityConfig};
//!
//! observability::init(&ObservabilityConfig::from_env())?;
//! ```

use std::fmt;

use tracing_subscriber::{fmt as subscriber_fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable format for development
    #[default]
    Pretty,
    /// JSON format for production/log aggregation
    Json,
    /// Compact single-line format
    Compact,
}

impl LogFormat {
    fn parse(name: &str) -> Self {
        match name {
            "json" => Self::Json,
            "compact" => Self::Compact,
            _ => Self::Pretty,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Log output format
    pub log_format: LogFormat,
    /// Log level filter (e.g., "info", "portcullis=debug")
    pub log_filter: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::default(),
            log_filter: "info".to_string(),
        }
    }
}

impl ObservabilityConfig {
    /// Create configuration from environment variables.
    ///
    /// - `LOG_FORMAT`: "pretty", "json", or "compact" (default: "pretty")
    /// - `RUST_LOG`: log filter directive (default: "info")
    pub fn from_env() -> Self {
        Self {
            log_format: std::env::var("LOG_FORMAT")
                .map(|s| LogFormat::parse(&s))
                .unwrap_or_default(),
            log_filter: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        }
    }
}

/// Observability initialization errors
#[derive(Debug)]
pub enum ObservabilityError {
    /// Invalid filter directive
    Config(String),
    /// Subscriber installation failed (usually: already initialized)
    Init(String),
}

impl fmt::Display for ObservabilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "Invalid observability config: {}", msg),
            Self::Init(msg) => write!(f, "Failed to initialize tracing: {}", msg),
        }
    }
}

impl std::error::Error for ObservabilityError {}

/// Initialize the tracing subscriber.
///
/// Call once at application startup, before any logging occurs.
pub fn init(config: &ObservabilityConfig) -> Result<(), ObservabilityError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .map_err(|e| ObservabilityError::Config(e.to_string()))?;

    let subscriber = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Pretty => subscriber
            .with(
                subscriber_fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init()
            .map_err(|e| ObservabilityError::Init(e.to_string()))?,
        LogFormat::Json => subscriber
            .with(subscriber_fmt::layer().json().with_target(true))
            .try_init()
            .map_err(|e| ObservabilityError::Init(e.to_string()))?,
        LogFormat::Compact => subscriber
            .with(subscriber_fmt::layer().compact().with_target(true))
            .try_init()
            .map_err(|e| ObservabilityError::Init(e.to_string()))?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("compact"), LogFormat::Compact);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("unknown"), LogFormat::Pretty);
    }
}
