//! Security-aware logging for the spend engine
//!
//! - Never logs private keys or WIF strings
//! - Truncates addresses and transaction ids before they reach the log
//! - Tags events with the context they come from
//! - Human-readable or JSON output
//!
//! # Usage
//!
//! ```
//! use bitvault_spend::logging::{self, LogConfig, LogLevel};
//! use serde_json::json;
//!
//! logging::init(&LogConfig::default()).expect("Failed to initialize logging");
//!
//! logging::log_transaction(
//!     LogLevel::Info,
//!     "transaction_built",
//!     Some(json!({ "txid": "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b" })),
//! );
//! ```

use chrono::Local;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs::OpenOptions;
use std::io::Write as IoWrite;
use std::sync::Once;

use crate::types::SensitiveString;

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Where a log event originates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogContext {
    /// Key handling and signing
    Security,
    /// Validation, selection and fee decisions
    Core,
    /// Chain backend calls
    Network,
    /// Transaction building and broadcasting
    Transaction,
}

/// Configuration for the logging system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default log level
    pub level: LogLevel,
    /// Path to log file (None for console-only)
    pub log_file: Option<String>,
    pub include_timestamps: bool,
    pub include_source_location: bool,
    /// Emit one JSON object per line
    pub json_format: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            log_file: None,
            include_timestamps: true,
            include_source_location: true,
            json_format: false,
        }
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

static LOGGING_INIT: Once = Once::new();

/// Initialize the logging system
///
/// Safe to call more than once: only the first call configures the logger,
/// later calls just apply `config.level`. A logger installed elsewhere (for
/// example by a test harness) is kept.
pub fn init(config: &LogConfig) -> Result<(), String> {
    if LOGGING_INIT.is_completed() {
        set_log_level(config.level);
        return Ok(());
    }

    let mut result = Ok(());

    let include_timestamps = config.include_timestamps;
    let include_source_location = config.include_source_location;
    let json_format = config.json_format;
    let log_file = config.log_file.clone();
    let level = config.level;

    LOGGING_INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();
        builder.filter_level(level.into());

        builder.format(move |buf, record| {
            let timestamp = if include_timestamps {
                Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string()
            } else {
                String::new()
            };

            let source_location = if include_source_location {
                format!(
                    " [{}:{}]",
                    record.file().unwrap_or("unknown"),
                    record.line().unwrap_or(0)
                )
            } else {
                String::new()
            };

            if json_format {
                let line = json!({
                    "timestamp": timestamp,
                    "level": record.level().to_string(),
                    "target": record.target(),
                    "location": source_location.trim(),
                    "message": record.args().to_string(),
                });
                writeln!(buf, "{}", line)
            } else {
                if include_timestamps {
                    write!(buf, "{} ", timestamp)?;
                }
                let mut style = buf.style();
                style.set_bold(true);
                writeln!(
                    buf,
                    "[{}{}] {}",
                    style.value(record.level()),
                    source_location,
                    record.args()
                )
            }
        });

        if let Some(file_path) = &log_file {
            match OpenOptions::new().create(true).append(true).open(file_path) {
                Ok(file) => {
                    builder.target(env_logger::Target::Pipe(Box::new(file)));
                }
                Err(e) => {
                    result = Err(format!("Failed to open log file {}: {}", file_path, e));
                    return;
                }
            }
        }

        // Another logger may already be installed; that is fine
        if builder.try_init().is_err() {
            log::debug!("Logger already initialized, using existing instance");
        }
    });

    result
}

/// Update the log level dynamically
pub fn set_log_level(level: LogLevel) {
    log::set_max_level(level.into());
}

/// Truncate a potentially sensitive value to its first and last 4 characters
pub fn sanitize_for_logging(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    match chars.len() {
        0 => String::new(),
        1..=8 => "*****".to_string(),
        len => {
            let first: String = chars[..4].iter().collect();
            let last: String = chars[len - 4..].iter().collect();
            format!("{}...{}", first, last)
        }
    }
}

/// Sanitize a SensitiveString for logging
///
/// Secrets are never partially revealed.
pub fn sanitize_sensitive(input: &SensitiveString) -> String {
    format!("[REDACTED {} chars]", input.len())
}

fn sanitize_and_log(
    level: LogLevel,
    context: LogContext,
    message: &str,
    params: Option<serde_json::Value>,
) {
    let sanitized_params = params.map(|p| match p {
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.into_iter()
                .map(|(k, v)| {
                    let value = match v {
                        serde_json::Value::String(s) => json!(sanitize_for_logging(&s)),
                        other => other,
                    };
                    (k, value)
                })
                .collect(),
        ),
        other => other,
    });

    match sanitized_params {
        Some(params) => log::log!(level.into(), "[{:?}] {} - {}", context, message, params),
        None => log::log!(level.into(), "[{:?}] {}", context, message),
    }
}

/// Log a security-related event (key loading, signing)
pub fn log_security(level: LogLevel, message: &str, params: Option<serde_json::Value>) {
    sanitize_and_log(level, LogContext::Security, message, params);
}

/// Log a core engine event
pub fn log_core(level: LogLevel, message: &str, params: Option<serde_json::Value>) {
    sanitize_and_log(level, LogContext::Core, message, params);
}

/// Log a chain backend event
pub fn log_network(level: LogLevel, message: &str, params: Option<serde_json::Value>) {
    sanitize_and_log(level, LogContext::Network, message, params);
}

/// Log a transaction event
///
/// String parameters are truncated, numbers are logged as-is.
pub fn log_transaction(level: LogLevel, message: &str, params: Option<serde_json::Value>) {
    sanitize_and_log(level, LogContext::Transaction, message, params);
}
