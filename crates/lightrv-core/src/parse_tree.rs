//! Concrete parse trees.
//!
//! The LR driver assembles a [`ParseTree`] bottom-up: terminals wrap the
//! shifted token, non-terminals own their children in source order. The tree
//! serializes to JSON for the `.cst` sidecar.

use serde::Serialize;

use crate::span::Span;
use crate::token::Token;

/// A node of the concrete parse tree.
#[derive(Debug, Clone, Serialize)]
pub struct ParseTree {
    /// Grammar symbol name (terminal kind or non-terminal name).
    pub symbol: String,
    pub terminal: bool,
    /// Matched source text, for terminals.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lexeme: Option<String>,
    pub span: Span,
    pub children: Vec<ParseTree>,
}

impl ParseTree {
    /// A leaf for a shifted token.
    pub fn terminal(token: &Token) -> Self {
        ParseTree {
            symbol: token.kind.clone(),
            terminal: true,
            lexeme: Some(token.text.clone()),
            span: token.span,
            children: Vec::new(),
        }
    }

    /// An interior node covering `children`, which must be in source order.
    pub fn non_terminal(symbol: impl Into<String>, children: Vec<ParseTree>) -> Self {
        let span = match (children.first(), children.last()) {
            (Some(first), Some(last)) => first.span.to(last.span),
            _ => Span::default(),
        };
        ParseTree {
            symbol: symbol.into(),
            terminal: false,
            lexeme: None,
            span,
            children,
        }
    }

    /// A node for an empty production, with a zero-width range.
    pub fn empty(symbol: impl Into<String>, at: Span) -> Self {
        ParseTree {
            symbol: symbol.into(),
            terminal: false,
            lexeme: None,
            span: Span::point(at.start_line, at.start_col),
            children: Vec::new(),
        }
    }

    /// The lexeme of this node, or `""` for non-terminals.
    pub fn text(&self) -> &str {
        self.lexeme.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(kind: &str, text: &str, line: u32, col: u32) -> Token {
        let width = text.len() as u32;
        Token::new(kind, text, Span::new(line, col, line, col + width))
    }

    #[test]
    fn non_terminal_span_covers_children() {
        let a = ParseTree::terminal(&tok("ID", "x", 1, 1));
        let b = ParseTree::terminal(&tok("ASG", "=", 1, 3));
        let c = ParseTree::terminal(&tok("NUM", "1", 1, 5));
        let stmt = ParseTree::non_terminal("Stmt", vec![a, b, c]);
        assert_eq!(stmt.span, Span::new(1, 1, 1, 6));
        assert_eq!(stmt.children.len(), 3);
        assert!(!stmt.terminal);
    }

    #[test]
    fn empty_node_is_zero_width() {
        let e = ParseTree::empty("Decls", Span::new(2, 4, 2, 9));
        assert_eq!(e.span, Span::point(2, 4));
        assert!(e.children.is_empty());
    }

    #[test]
    fn serializes_to_json() {
        let leaf = ParseTree::terminal(&tok("NUM", "42", 1, 1));
        let json = serde_json::to_string(&leaf).unwrap();
        assert!(json.contains("\"symbol\":\"NUM\""));
        assert!(json.contains("\"lexeme\":\"42\""));
    }
}
