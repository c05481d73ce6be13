//! Grammar file parsing.
//!
//! Grammars are plain text, one rule per line: `LHS -> α | β | …` with
//! whitespace-delimited symbols on the right-hand side and `ε` for the empty
//! alternative. The first left-hand side encountered is the start symbol, a
//! blank line terminates the file, and production indices are assigned in
//! encounter order; production 0 is the accepting production.

use indexmap::IndexSet;

use crate::error::SyntaxError;

/// The empty right-hand side marker.
pub const EPSILON: &str = "ε";

/// The injected end-of-input terminal.
pub const EOF_SYMBOL: &str = "EOF";

/// A single production `lhs -> rhs`, with its encounter-order index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Production {
    pub id: usize,
    pub lhs: String,
    /// Empty for an `ε` alternative.
    pub rhs: Vec<String>,
}

/// A context-free grammar with its symbol sets in encounter order.
#[derive(Debug, Clone)]
pub struct Grammar {
    pub productions: Vec<Production>,
    pub non_terminals: IndexSet<String>,
    pub terminals: IndexSet<String>,
    pub start: String,
}

impl Grammar {
    /// Parse a grammar from text. Reading stops at the first blank line.
    pub fn parse(text: &str) -> Result<Grammar, SyntaxError> {
        let lines: Vec<&str> = text
            .lines()
            .take_while(|line| !line.trim().is_empty())
            .collect();

        // First pass: collect non-terminals so terminals can be told apart,
        // and pick the start symbol.
        let mut non_terminals = IndexSet::new();
        let mut start = String::new();
        for line in &lines {
            let Some((lhs, _)) = line.split_once("->") else {
                continue;
            };
            let lhs = lhs.trim();
            if start.is_empty() {
                start = lhs.to_string();
            }
            non_terminals.insert(lhs.to_string());
        }
        if start.is_empty() {
            return Err(SyntaxError::EmptyGrammar);
        }

        // Second pass: productions and terminals.
        let mut productions = Vec::new();
        let mut terminals = IndexSet::new();
        for line in &lines {
            let Some((lhs, rhs_text)) = line.split_once("->") else {
                continue;
            };
            let lhs = lhs.trim();
            for alternative in rhs_text.split('|') {
                let mut rhs = Vec::new();
                for symbol in alternative.split_whitespace() {
                    if !non_terminals.contains(symbol) && symbol != EPSILON {
                        terminals.insert(symbol.to_string());
                    }
                    rhs.push(symbol.to_string());
                }
                if rhs.len() == 1 && rhs[0] == EPSILON {
                    rhs.clear();
                }
                productions.push(Production {
                    id: productions.len(),
                    lhs: lhs.to_string(),
                    rhs,
                });
            }
        }
        terminals.insert(EOF_SYMBOL.to_string());

        Ok(Grammar {
            productions,
            non_terminals,
            terminals,
            start,
        })
    }

    pub fn is_terminal(&self, symbol: &str) -> bool {
        self.terminals.contains(symbol)
    }

    pub fn is_non_terminal(&self, symbol: &str) -> bool {
        self.non_terminals.contains(symbol)
    }

    /// All productions with the given left-hand side.
    pub fn productions_of<'a>(&'a self, lhs: &'a str) -> impl Iterator<Item = &'a Production> {
        self.productions.iter().filter(move |p| p.lhs == lhs)
    }
}
