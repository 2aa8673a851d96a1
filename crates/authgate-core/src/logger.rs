// Structured logger with level filtering and custom handler support.
//
// The engine logs resolution outcomes through this; deployments plug in
// their own backend via `LogHandler`.

use std::fmt;
use std::sync::Arc;

/// Log levels, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Custom log handler for user-provided logging backends.
pub trait LogHandler: Send + Sync + fmt::Debug {
    fn handle(&self, level: LogLevel, message: &str);
}

/// The internal logger used throughout the framework.
#[derive(Clone)]
pub struct AuthLogger {
    disabled: bool,
    level: LogLevel,
    handler: Option<Arc<dyn LogHandler>>,
}

impl fmt::Debug for AuthLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthLogger")
            .field("level", &self.level)
            .field("disabled", &self.disabled)
            .finish()
    }
}

impl Default for AuthLogger {
    fn default() -> Self {
        Self {
            disabled: false,
            level: LogLevel::Warn,
            handler: None,
        }
    }
}

impl AuthLogger {
    pub fn new(level: LogLevel) -> Self {
        Self {
            disabled: false,
            level,
            handler: None,
        }
    }

    /// A logger that emits nothing. Used in tests.
    pub fn disabled() -> Self {
        Self {
            disabled: true,
            level: LogLevel::Error,
            handler: None,
        }
    }

    pub fn with_handler(mut self, handler: Arc<dyn LogHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn should_publish(&self, level: LogLevel) -> bool {
        !self.disabled && level >= self.level
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    pub fn log(&self, level: LogLevel, message: &str) {
        if !self.should_publish(level) {
            return;
        }

        if let Some(ref handler) = self.handler {
            handler.handle(level, message);
            return;
        }

        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        let formatted = format!("{timestamp} {} [authgate]: {message}", level.as_str());
        match level {
            LogLevel::Warn | LogLevel::Error => eprintln!("{formatted}"),
            _ => println!("{formatted}"),
        }
    }
}
