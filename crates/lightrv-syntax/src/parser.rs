//! The table-driven LR parser.
//!
//! A shift/reduce/accept loop over the token stream that assembles a
//! concrete parse tree. On a table miss the parser enters panic mode: it
//! emits a single diagnostic, then discards tokens until a shift or reduce
//! succeeds or the input ends.

use lightrv_core::{Diagnostic, ParseTree, Span, Token};

use crate::grammar::Grammar;
use crate::slr::{Action, ParseTable};

/// Result of one parse run: the tree (if accepted) plus accumulated
/// diagnostics.
#[derive(Debug)]
pub struct ParseOutcome {
    pub tree: Option<ParseTree>,
    pub diagnostics: Vec<Diagnostic>,
}

/// An LR parser driving a prebuilt SLR(1) table.
pub struct LrParser<'g> {
    grammar: &'g Grammar,
    table: &'g ParseTable,
}

impl<'g> LrParser<'g> {
    pub fn new(grammar: &'g Grammar, table: &'g ParseTable) -> Self {
        LrParser { grammar, table }
    }

    /// Parse a token stream ending in EOF.
    pub fn parse(&self, tokens: &[Token]) -> ParseOutcome {
        let mut diagnostics = Vec::new();
        let mut states: Vec<usize> = vec![0];
        let mut nodes: Vec<ParseTree> = Vec::new();
        let mut cursor = 0usize;
        let mut panicking = false;

        loop {
            let Some(token) = tokens.get(cursor) else {
                // The scanner always appends EOF; running off the end means
                // the input was truncated.
                diagnostics.push(Diagnostic::parse(
                    Span::default(),
                    "unexpected end of input".to_string(),
                ));
                return ParseOutcome {
                    tree: None,
                    diagnostics,
                };
            };

            if !self.grammar.is_terminal(&token.kind) {
                diagnostics.push(Diagnostic::parse(
                    token.span,
                    format!("unknown input token: {}", token.kind),
                ));
                cursor += 1;
                continue;
            }

            let state = *states.last().unwrap_or(&0);
            match self.table.action(state, &token.kind) {
                Some(Action::Shift(next)) => {
                    states.push(next);
                    nodes.push(ParseTree::terminal(token));
                    panicking = false;
                    if token.is_eof() {
                        // EOF can only be accepted, never shifted.
                        diagnostics.push(Diagnostic::parse(
                            token.span,
                            "unexpected end of input".to_string(),
                        ));
                        return ParseOutcome {
                            tree: None,
                            diagnostics,
                        };
                    }
                    cursor += 1;
                }
                Some(Action::Reduce(p)) => {
                    panicking = false;
                    if !self.reduce(p, &mut states, &mut nodes, token, &mut diagnostics) {
                        continue;
                    }
                }
                Some(Action::Accept(p)) => {
                    self.pop_for(p, &mut states, &mut nodes, token);
                    return ParseOutcome {
                        tree: nodes.pop(),
                        diagnostics,
                    };
                }
                None => {
                    if !panicking {
                        diagnostics.push(Diagnostic::parse(
                            token.span,
                            format!("unexpected token near {}", token.kind),
                        ));
                    }
                    panicking = true;
                    if token.is_eof() {
                        return ParseOutcome {
                            tree: None,
                            diagnostics,
                        };
                    }
                    cursor += 1;
                }
            }
        }
    }

    /// Pop `|rhs(p)|` state/node pairs and push the assembled non-terminal.
    fn pop_for(&self, production: usize, states: &mut Vec<usize>, nodes: &mut Vec<ParseTree>, at: &Token) {
        let prod = &self.grammar.productions[production];
        if prod.rhs.is_empty() {
            nodes.push(ParseTree::empty(&prod.lhs, at.span));
            return;
        }
        let mut children = Vec::with_capacity(prod.rhs.len());
        for _ in 0..prod.rhs.len() {
            states.pop();
            if let Some(node) = nodes.pop() {
                children.push(node);
            }
        }
        // The stack pops children in reverse source order.
        children.reverse();
        nodes.push(ParseTree::non_terminal(&prod.lhs, children));
    }

    /// Perform the reduction and consult GOTO. Returns false when the GOTO
    /// entry is missing (corrupt table), after recording a diagnostic.
    fn reduce(
        &self,
        production: usize,
        states: &mut Vec<usize>,
        nodes: &mut Vec<ParseTree>,
        at: &Token,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> bool {
        self.pop_for(production, states, nodes, at);
        let lhs = &self.grammar.productions[production].lhs;
        let state = *states.last().unwrap_or(&0);
        match self.table.goto(state, lhs) {
            Some(next) => {
                states.push(next);
                true
            }
            None => {
                diagnostics.push(Diagnostic::parse(
                    at.span,
                    format!("no goto for {} near {}", lhs, at.kind),
                ));
                false
            }
        }
    }
}
