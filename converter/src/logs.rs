//! Leveled console logging for pipeline progress.
//!
//! Every entry is printed to stderr with a level prefix. Quiet mode hides
//! info and success lines.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// Log level for console display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A single log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Log level
    pub level: LogLevel,
    /// Log message
    pub message: String,
    /// Optional indentation level (for nested logs)
    #[serde(default)]
    pub indent: u8,
}

impl LogEntry {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Info, message: message.into(), indent: 0 }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Success, message: message.into(), indent: 0 }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Warning, message: message.into(), indent: 0 }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Error, message: message.into(), indent: 0 }
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }

    /// Render the entry the way it appears on the console.
    pub fn render(&self) -> String {
        let prefix = match self.level {
            LogLevel::Info => "   ",
            LogLevel::Success => "   ✓",
            LogLevel::Warning => "   ⚠️",
            LogLevel::Error => "   ❌",
        };
        let indent = "   ".repeat(self.indent as usize);
        format!("{}{} {}", indent, prefix, self.message)
    }
}

/// Global logger
pub static LOGGER: Lazy<Logger> = Lazy::new(Logger::new);

/// Prints log entries to stderr
pub struct Logger {
    quiet: AtomicBool,
}

impl Logger {
    pub fn new() -> Self {
        Self {
            quiet: AtomicBool::new(false),
        }
    }

    /// Suppress info and success lines on the console.
    /// Warnings and errors are always printed.
    pub fn set_quiet(&self, quiet: bool) {
        self.quiet.store(quiet, Ordering::Relaxed);
    }

    /// Whether `entry` would be printed.
    pub fn shows(&self, entry: &LogEntry) -> bool {
        matches!(entry.level, LogLevel::Warning | LogLevel::Error) || !self.quiet.load(Ordering::Relaxed)
    }

    pub fn log(&self, entry: LogEntry) {
        if self.shows(&entry) {
            eprintln!("{}", entry.render());
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenient logging functions
pub fn log_info(msg: impl Into<String>) {
    LOGGER.log(LogEntry::info(msg));
}

pub fn log_success(msg: impl Into<String>) {
    LOGGER.log(LogEntry::success(msg));
}

pub fn log_warning(msg: impl Into<String>) {
    LOGGER.log(LogEntry::warning(msg));
}

pub fn log_error(msg: impl Into<String>) {
    LOGGER.log(LogEntry::error(msg));
}

pub fn log_info_indent(msg: impl Into<String>, indent: u8) {
    LOGGER.log(LogEntry::info(msg).with_indent(indent));
}

pub fn log_success_indent(msg: impl Into<String>, indent: u8) {
    LOGGER.log(LogEntry::success(msg).with_indent(indent));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_prefix_and_indent() {
        let entry = LogEntry::warning("3 trinomial names").with_indent(1);
        let line = entry.render();
        assert!(line.starts_with("      ⚠️"));
        assert!(line.ends_with("3 trinomial names"));
    }

    #[test]
    fn test_quiet_keeps_warnings_and_errors() {
        let logger = Logger::new();
        assert!(logger.shows(&LogEntry::info("reading")));

        logger.set_quiet(true);
        assert!(!logger.shows(&LogEntry::info("reading")));
        assert!(!logger.shows(&LogEntry::success("done")));
        assert!(logger.shows(&LogEntry::warning("odd row")));
        assert!(logger.shows(&LogEntry::error("boom")));
    }

    #[test]
    fn test_entry_serializes_lowercase_level() {
        let json = serde_json::to_value(LogEntry::error("boom")).unwrap();
        assert_eq!(json["level"], "error");
        assert_eq!(json["indent"], 0);
    }
}
