// src/logging.rs

//! Logging setup for `hotserve` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `HOTSERVE_LOG` environment variable (e.g. "info", "debug")
//! 3. default to `info`
//!
//! Logs are sent to STDERR so that the runtime process can keep its own
//! stdin/stdout conventions.
//!
//! Every line coming from a build target or the runtime process is logged
//! through a [`PrefixLogger`], so it is easy to tell which component a line
//! belongs to when several targets write at the same time.

use anyhow::Result;
use tracing::{error, info, warn};
use tracing_subscriber::fmt;

use crate::cli::LogLevel;
use crate::runtime::{LineSink, OutputStream};

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let level = match cli_level {
        Some(lvl) => level_from_log_level(lvl),
        None => std::env::var("HOTSERVE_LOG")
            .ok()
            .and_then(|s| parse_level_str(&s))
            .unwrap_or(tracing::Level::INFO),
    };

    fmt()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn level_from_log_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
}

pub fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}

/// Line-oriented logger that tags every message with a component prefix.
///
/// Messages are rendered as `[<prefix>] <message>`; multi-line messages get
/// the prefix repeated on every line. The prefix is also attached as the
/// structured `component` field.
#[derive(Debug, Clone)]
pub struct PrefixLogger {
    prefix: String,
}

impl PrefixLogger {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn info(&self, message: &str) {
        let message = self.format(message);
        info!(component = %self.prefix, "{message}");
    }

    pub fn warn(&self, message: &str) {
        let message = self.format(message);
        warn!(component = %self.prefix, "{message}");
    }

    pub fn error(&self, message: &str) {
        let message = self.format(message);
        error!(component = %self.prefix, "{message}");
    }

    /// Prefix every line of `message` with `[<prefix>] `.
    pub fn format(&self, message: &str) -> String {
        let tag = format!("[{}] ", self.prefix);
        let mut out = String::with_capacity(message.len() + tag.len());
        for (i, line) in message.split('\n').enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&tag);
            out.push_str(line);
        }
        out
    }
}

impl LineSink for PrefixLogger {
    fn line(&self, _stream: OutputStream, line: &str) {
        self.info(line);
    }
}
