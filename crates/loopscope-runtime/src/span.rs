//! Source spans and line mapping
//!
//! Byte-offset spans attached to tokens and AST nodes, plus a line index
//! for mapping offsets back to 1-based source lines (stack frames and
//! diagnostics report lines, not offsets).

use serde::{Deserialize, Serialize};

/// A half-open byte range into the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    /// Start byte offset (inclusive)
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
}

impl Span {
    /// Create a new span
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// A span that points nowhere (synthesized nodes)
    pub fn dummy() -> Self {
        Self { start: 0, end: 0 }
    }

    /// Merge two spans into one covering both
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Precomputed line-start offsets for a source string
///
/// `line_at` answers "which 1-based line does this byte offset fall on",
/// which is all the simulator needs to attribute frames to lines.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    /// Build a line index for the given source
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts }
    }

    /// 1-based line number containing the given byte offset
    pub fn line_at(&self, offset: usize) -> u32 {
        self.line_starts.partition_point(|&start| start <= offset) as u32
    }
}
