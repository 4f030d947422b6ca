//! Tracing subscriber setup

use std::fmt;
use std::str::FromStr;

use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;
use crate::error::ApiError;

/// Target of the template store and cache events
const TEMPLATES_TARGET: &str = "aquila_templates";

/// Accepted log level names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Critical,
    Error,
    Warning,
    Info,
    Debug,
}

impl LogLevel {
    /// Equivalent `EnvFilter` directive
    pub fn as_directive(&self) -> &'static str {
        match self {
            // tracing has nothing above error
            LogLevel::Critical | LogLevel::Error => "error",
            LogLevel::Warning => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CRITICAL" => Ok(LogLevel::Critical),
            "ERROR" => Ok(LogLevel::Error),
            "WARNING" => Ok(LogLevel::Warning),
            "INFO" => Ok(LogLevel::Info),
            "DEBUG" => Ok(LogLevel::Debug),
            other => Err(ApiError::config(format!("Invalid log level '{}'", other))),
        }
    }
}

/// Output format of log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line
    Json,
    /// Compact human readable lines
    Brief,
}

impl FromStr for LogFormat {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "brief" => Ok(LogFormat::Brief),
            other => Err(ApiError::config(format!("Invalid log formatter '{}'", other))),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Json => f.write_str("json"),
            LogFormat::Brief => f.write_str("brief"),
        }
    }
}

/// Filter directives for the configured root and template store levels
pub fn filter_directives(root: LogLevel, templates: LogLevel) -> String {
    format!(
        "{},{}={}",
        root.as_directive(),
        TEMPLATES_TARGET,
        templates.as_directive()
    )
}

/// Install the global subscriber. `RUST_LOG` wins over the configured levels.
pub fn init(config: &ServerConfig) {
    let filter = std::env::var("RUST_LOG")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(EnvFilter::new)
        .unwrap_or_else(|| {
            EnvFilter::new(filter_directives(
                config.root_log_level,
                config.blob_log_level,
            ))
        });

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match config.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Brief => builder.compact().init(),
    }
}
