//! Compile diagnostics.
//!
//! User-facing errors are accumulated [`Diagnostic`] values, never propagated
//! as `Err`: each stage collects what it finds and runs to completion where it
//! can. The driver inspects the list after every stage and stops the pipeline
//! for that input when it is non-empty.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::span::Span;

/// Pipeline stage a diagnostic originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Lexer,
    Parse,
    Semantic,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Lexer => write!(f, "Lexer"),
            Stage::Parse => write!(f, "Parse"),
            Stage::Semantic => write!(f, "Semantic"),
        }
    }
}

/// One accumulated compile error with its source range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub stage: Stage,
    pub span: Span,
    pub message: String,
}

impl Diagnostic {
    pub fn new(stage: Stage, span: Span, message: impl Into<String>) -> Self {
        Diagnostic {
            stage,
            span,
            message: message.into(),
        }
    }

    pub fn lexer(span: Span, message: impl Into<String>) -> Self {
        Diagnostic::new(Stage::Lexer, span, message)
    }

    pub fn parse(span: Span, message: impl Into<String>) -> Self {
        Diagnostic::new(Stage::Parse, span, message)
    }

    pub fn semantic(span: Span, message: impl Into<String>) -> Self {
        Diagnostic::new(Stage::Semantic, span, message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error:{}:{} error {}.", self.span, self.stage, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_renders_position_and_category() {
        let d = Diagnostic::semantic(Span::new(3, 1, 3, 5), "undeclared variable: x");
        assert_eq!(
            format!("{}", d),
            "error:3:1:3:5:Semantic error undeclared variable: x."
        );
    }

    #[test]
    fn stage_names() {
        assert_eq!(format!("{}", Stage::Lexer), "Lexer");
        assert_eq!(format!("{}", Stage::Parse), "Parse");
        assert_eq!(format!("{}", Stage::Semantic), "Semantic");
    }
}
