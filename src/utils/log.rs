//! Log Module

use colored::Colorize;
use std::sync::{Once, RwLock};

static INIT: Once = Once::new();
static LOG_LEVEL: RwLock<LogLevel> = RwLock::new(LogLevel::Log);

/// This enum is used to represent the different log levels
#[derive(PartialEq, PartialOrd, Debug, Clone, Copy)]
pub enum LogLevel {
    Debug,
    Info,
    Log,
    Warn,
    Error,
}

impl LogLevel {
    fn from_name(name: &str) -> LogLevel {
        match name {
            "Debug" | "debug" => LogLevel::Debug,
            "Info" | "info" => LogLevel::Info,
            "Log" | "log" => LogLevel::Log,
            "Warn" | "warn" => LogLevel::Warn,
            "Error" | "error" => LogLevel::Error,
            _ => LogLevel::Log,
        }
    }
}

/// Reads the level from `CPPKG_LOG_LEVEL`, called once on first use
fn init_log_level() {
    let level = std::env::var("CPPKG_LOG_LEVEL").unwrap_or_else(|_| "Log".to_string());
    if let Ok(mut write_lock) = LOG_LEVEL.write() {
        *write_lock = LogLevel::from_name(&level);
    }
}

/// Overrides the level picked from the environment.
pub fn set_log_level(level: LogLevel) {
    INIT.call_once(|| {});
    if let Ok(mut write_lock) = LOG_LEVEL.write() {
        *write_lock = level;
    }
}

/// This function is used to log messages to the console
/// # Arguments
/// * `level` - The log level of the message
/// * `message` - The message to log
/// # Example
/// ```
/// use cppkg::utils::log::{log, LogLevel};
/// log(LogLevel::Info, "Hello World!");
/// log(LogLevel::Error, &format!("Something went wrong! {}", 42));
/// ```
///
/// # Level setting
/// The log level can be set by setting the environment variable `CPPKG_LOG_LEVEL`
/// to one of the following values:
/// * `Debug`
/// * `Info`
/// * `Log`
/// * `Warn`
/// * `Error`
/// If the environment variable is not set, the default log level is `Log`
pub fn log(level: LogLevel, message: &str) {
    INIT.call_once(|| {
        init_log_level();
    });
    let level_str = match level {
        LogLevel::Debug => "[DEBUG]".purple(),
        LogLevel::Info => "[INFO]".blue(),
        LogLevel::Log => "[LOG]".green(),
        LogLevel::Warn => "[WARN]".yellow(),
        LogLevel::Error => "[ERROR]".red(),
    };
    let enabled = LOG_LEVEL.read().map(|current| level >= *current).unwrap_or(true);
    if !enabled {
        return;
    }
    if level >= LogLevel::Warn {
        eprintln!("{} {}", level_str, message);
    } else {
        println!("{} {}", level_str, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_names() {
        assert_eq!(LogLevel::from_name("Debug"), LogLevel::Debug);
        assert_eq!(LogLevel::from_name("warn"), LogLevel::Warn);
        assert_eq!(LogLevel::from_name("bogus"), LogLevel::Log);
    }

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Error > LogLevel::Warn);
        assert!(LogLevel::Debug < LogLevel::Info);
    }
}
