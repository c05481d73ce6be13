//! Source ranges.
//!
//! Every token, parse tree node, AST node and diagnostic carries a [`Span`]:
//! a four-integer `(start_line, start_col, end_line, end_col)` range into the
//! source text. Lines and columns are 1-based; the end position is exclusive.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A half-open source range `[start, end)` in line/column coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl Span {
    pub fn new(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Span {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// A zero-width span at a single position.
    pub fn point(line: u32, col: u32) -> Self {
        Span::new(line, col, line, col)
    }

    /// The smallest span covering both `self` and `other`.
    ///
    /// Assumes `self` starts no later than `other` ends, which holds for
    /// parse tree children collected in source order.
    pub fn to(self, other: Span) -> Span {
        Span {
            start_line: self.start_line,
            start_col: self.start_col,
            end_line: other.end_line,
            end_col: other.end_col,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.start_line, self.start_col, self.end_line, self.end_col
        )
    }
}
