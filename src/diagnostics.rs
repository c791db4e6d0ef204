//! Diagnostic Infrastructure
//!
//! This module provides the structured syntax error raised by the scanner
//! and parser. Errors carry both human-oriented coordinates (1-based line
//! and column) and byte offsets so embedders can render the offending
//! source excerpt.
//!
//! # Example
//!
//! ```ignore
//! match parse(source, ParseGoal::Script) {
//!     Ok(root) => { /* ... */ }
//!     Err(err) => eprintln!("{}", err),   // "Unexpected token ')' (3:14)"
//! }
//! ```

use crate::span::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Position
// =============================================================================

/// A resolved source position derived from the scanner's line table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Line number (1-based)
    pub line: u32,
    /// Column number (1-based)
    pub column: u32,
    /// Byte offset of the start of the line
    pub line_offset: u32,
    /// Byte offset of the position itself
    pub start_offset: u32,
    /// Byte offset of the end of the region being reported
    pub end_offset: u32,
}

// =============================================================================
// SyntaxError
// =============================================================================

/// A syntax error with location information.
///
/// Raised synchronously by `parse` and `translate`; there is no local
/// recovery. The replacer trusts a well-formed AST and does not generate
/// errors of its own.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyntaxError {
    /// Human-readable message
    pub message: String,
    /// Line number (1-based)
    pub line: u32,
    /// Column number (1-based)
    pub column: u32,
    /// Byte offset of the start of the offending line
    pub line_offset: u32,
    /// Byte offset of the start of the offending region
    pub start_offset: u32,
    /// Byte offset of the end of the offending region
    pub end_offset: u32,
}

impl SyntaxError {
    /// Create a new syntax error from a message and a resolved position.
    pub fn new(message: impl Into<String>, pos: Position) -> Self {
        SyntaxError {
            message: message.into(),
            line: pos.line,
            column: pos.column,
            line_offset: pos.line_offset,
            start_offset: pos.start_offset,
            end_offset: pos.end_offset,
        }
    }

    /// The byte span of the offending region.
    pub fn span(&self) -> Span {
        Span::new(self.start_offset, self.end_offset)
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.message, self.line, self.column)
    }
}

impl std::error::Error for SyntaxError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_display() {
        let err = SyntaxError::new(
            "Unexpected token ')'",
            Position {
                line: 3,
                column: 14,
                line_offset: 40,
                start_offset: 53,
                end_offset: 54,
            },
        );
        assert_eq!(err.to_string(), "Unexpected token ')' (3:14)");
        assert_eq!(err.span(), Span::new(53, 54));
    }

    #[test]
    fn test_syntax_error_serialize() {
        let err = SyntaxError::new("Invalid character", Position::default());
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"message\":\"Invalid character\""));
        let back: SyntaxError = serde_json::from_str(&json).unwrap();
        assert_eq!(back.message, err.message);
    }
}
