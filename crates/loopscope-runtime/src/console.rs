//! Instrumented console output sink
//!
//! Records every output call as an ordered log entry. The sink itself knows
//! nothing about the call stack; the instrumentation layer pushes/pops the
//! short-lived `console.*` frames around writes.

use crate::value::Value;

/// Output severity, mapped to the console method that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleLevel {
    Log,
    Warn,
    Error,
    Info,
}

impl ConsoleLevel {
    /// Console method name as written in source
    pub fn method(&self) -> &'static str {
        match self {
            ConsoleLevel::Log => "log",
            ConsoleLevel::Warn => "warn",
            ConsoleLevel::Error => "error",
            ConsoleLevel::Info => "info",
        }
    }

    /// Look up a level by console method name
    pub fn from_method(name: &str) -> Option<ConsoleLevel> {
        match name {
            "log" => Some(ConsoleLevel::Log),
            "warn" => Some(ConsoleLevel::Warn),
            "error" => Some(ConsoleLevel::Error),
            "info" => Some(ConsoleLevel::Info),
            _ => None,
        }
    }

    /// Line prefix for this level ("Error: ", etc.; log lines are bare)
    fn prefix(&self) -> &'static str {
        match self {
            ConsoleLevel::Log => "",
            ConsoleLevel::Warn => "Warning: ",
            ConsoleLevel::Error => "Error: ",
            ConsoleLevel::Info => "Info: ",
        }
    }
}

/// Ordered log of formatted console output
#[derive(Debug, Default)]
pub struct ConsoleSink {
    lines: Vec<String>,
}

impl ConsoleSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pre-formatted message at the given level
    pub fn write(&mut self, level: ConsoleLevel, message: impl AsRef<str>) {
        self.lines
            .push(format!("{}{}", level.prefix(), message.as_ref()));
    }

    /// Format arguments the way console methods do and append the line
    pub fn write_values(&mut self, level: ConsoleLevel, args: &[Value]) {
        self.write(level, format_args_line(args));
    }

    /// All recorded lines, oldest first
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Copy of the log for snapshot projection
    pub fn to_vec(&self) -> Vec<String> {
        self.lines.clone()
    }

    /// Discard all recorded output
    pub fn reset(&mut self) {
        self.lines.clear();
    }
}

/// Join argument values with single spaces, string values rendered bare
pub fn format_args_line(args: &[Value]) -> String {
    let parts: Vec<String> = args.iter().map(|v| v.to_string()).collect();
    parts.join(" ")
}
