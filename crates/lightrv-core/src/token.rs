//! Lexical tokens.
//!
//! The scanner produces an ordered sequence of tokens `(kind, lexeme, span)`.
//! Token kinds are the terminal names of the grammar (`ID`, `NUM`, `ASG`, ...)
//! plus the synthetic end-of-input kind [`Token::EOF`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::span::Span;

/// A single lexical token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Terminal name this token matches in the grammar.
    pub kind: String,
    /// The matched source text.
    pub text: String,
    pub span: Span,
}

impl Token {
    /// The synthetic end-of-input terminal.
    pub const EOF: &'static str = "EOF";

    pub fn new(kind: impl Into<String>, text: impl Into<String>, span: Span) -> Self {
        Token {
            kind: kind.into(),
            text: text.into(),
            span,
        }
    }

    /// The end-of-input token at the given position.
    pub fn eof(span: Span) -> Self {
        Token::new(Token::EOF, "", span)
    }

    pub fn is_eof(&self) -> bool {
        self.kind == Token::EOF
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.kind, self.text)
    }
}
