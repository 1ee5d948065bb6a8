//! Diagnostic system for lex and parse errors
//!
//! All source-level errors flow through the unified Diagnostic type. The
//! execution engine never propagates these past its boundary; they are
//! formatted into the simulated console output instead (see `engine`).

use crate::span::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity level of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    /// Fatal error that prevents the run from starting
    Error,
    /// Warning that doesn't prevent the run
    Warning,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticLevel::Error => write!(f, "error"),
            DiagnosticLevel::Warning => write!(f, "warning"),
        }
    }
}

/// A diagnostic message (error or warning)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity level
    pub level: DiagnosticLevel,
    /// Error code (e.g., "LS1001")
    pub code: String,
    /// Main diagnostic message
    pub message: String,
    /// Line number (1-based)
    pub line: usize,
    /// Source line string
    pub snippet: String,
    /// Offending span
    pub span: Span,
}

impl Diagnostic {
    /// Create a new error diagnostic with code
    pub fn error_with_code(
        code: impl Into<String>,
        message: impl Into<String>,
        span: Span,
    ) -> Self {
        Self {
            level: DiagnosticLevel::Error,
            code: code.into(),
            message: message.into(),
            line: 1,
            snippet: String::new(),
            span,
        }
    }

    /// Create a new error diagnostic (uses generic error code)
    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Self::error_with_code("LS9999", message, span)
    }

    /// Set the line number
    pub fn with_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }

    /// Set the snippet (source line)
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = snippet.into();
        self
    }
}

impl fmt::Display for Diagnostic {
    // Matches how the console output renders initialization failures.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}]: {} (line {})",
            self.level, self.code, self.message, self.line
        )
    }
}

/// Error codes used by the simulator front end
pub mod error_codes {
    /// Lexer errors
    pub const LEX: &str = "LS1001";
    /// Parser errors
    pub const PARSE: &str = "LS2001";
}
