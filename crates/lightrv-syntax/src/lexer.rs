//! The table-driven scanner.
//!
//! The scanner is a DFA loaded from an external five-tuple text file: the
//! state set, the start state, the accepting states with their token kinds,
//! and the transition table whose input classes are one-character regular
//! expressions. Recognition is maximal munch: the machine walks as far as it
//! can, then accepts iff it stopped in an accepting state. Matches of the
//! `SKIP` kind are discarded; an unrecognised character is reported and
//! consumed so scanning continues.

use indexmap::{IndexMap, IndexSet};
use regex::Regex;

use lightrv_core::{Diagnostic, Span, Token};

use crate::error::SyntaxError;

/// Token kind whose matches are dropped (whitespace, comments).
pub const SKIP: &str = "SKIP";

#[derive(Debug)]
struct Transition {
    from: String,
    pattern: Regex,
    to: String,
}

/// A deterministic finite automaton over single characters.
#[derive(Debug)]
pub struct Dfa {
    states: IndexSet<String>,
    start: String,
    accepts: IndexMap<String, String>,
    transitions: Vec<Transition>,
}

impl Dfa {
    /// Parse the five-tuple table format: state count and names, start
    /// state, accept count and `state kind` pairs, transition count and
    /// `from pattern to` triples. Fields are whitespace-delimited.
    pub fn parse(text: &str) -> Result<Dfa, SyntaxError> {
        let mut fields = text.split_whitespace();
        let mut next = |what: &str| -> Result<&str, SyntaxError> {
            fields.next().ok_or_else(|| SyntaxError::MalformedDfa {
                reason: format!("missing {}", what),
            })
        };

        let state_count: usize = parse_count(next("state count")?)?;
        let mut states = IndexSet::new();
        for _ in 0..state_count {
            states.insert(next("state name")?.to_string());
        }

        let start = next("start state")?.to_string();

        let accept_count: usize = parse_count(next("accept count")?)?;
        let mut accepts = IndexMap::new();
        for _ in 0..accept_count {
            let state = next("accept state")?.to_string();
            let kind = next("accept token kind")?.to_string();
            accepts.insert(state, kind);
        }

        let transition_count: usize = parse_count(next("transition count")?)?;
        let mut transitions = Vec::with_capacity(transition_count);
        for _ in 0..transition_count {
            let from = next("transition source")?.to_string();
            let raw = next("transition pattern")?.to_string();
            let to = next("transition target")?.to_string();
            // Anchor so the pattern must cover the whole single character.
            let pattern = Regex::new(&format!("^(?:{})$", raw)).map_err(|e| {
                SyntaxError::BadPattern {
                    pattern: raw.clone(),
                    reason: e.to_string(),
                }
            })?;
            transitions.push(Transition { from, pattern, to });
        }

        Ok(Dfa {
            states,
            start,
            accepts,
            transitions,
        })
    }

    /// Load and validate a DFA table file.
    pub fn load(path: &std::path::Path) -> Result<Dfa, SyntaxError> {
        let text = std::fs::read_to_string(path)?;
        let dfa = Dfa::parse(&text)?;
        dfa.validate()?;
        Ok(dfa)
    }

    /// Check the machine is well formed before scanning anything with it.
    pub fn validate(&self) -> Result<(), SyntaxError> {
        if !self.states.contains(&self.start) {
            return Err(SyntaxError::UnknownStartState {
                state: self.start.clone(),
            });
        }
        if self.accepts.is_empty() {
            return Err(SyntaxError::NoAcceptStates);
        }
        for state in self.accepts.keys() {
            if !self.states.contains(state) {
                return Err(SyntaxError::UnknownAcceptState {
                    state: state.clone(),
                });
            }
        }
        Ok(())
    }

    fn step(&self, state: &str, ch: char) -> Option<&str> {
        let mut buf = [0u8; 4];
        let s: &str = ch.encode_utf8(&mut buf);
        self.transitions
            .iter()
            .find(|t| t.from == state && t.pattern.is_match(s))
            .map(|t| t.to.as_str())
    }

    /// Run the machine over a prefix of `input`. Returns the accepted token
    /// kind (if the walk ended in an accepting state) and the number of
    /// characters consumed.
    fn recognize(&self, input: &str) -> (Option<&str>, usize) {
        let mut state = self.start.as_str();
        let mut consumed = 0;
        for ch in input.chars() {
            match self.step(state, ch) {
                Some(next) => {
                    state = next;
                    consumed += 1;
                }
                None => break,
            }
        }
        (self.accepts.get(state).map(String::as_str), consumed)
    }
}

/// Result of scanning one source file.
#[derive(Debug)]
pub struct LexOutcome {
    pub tokens: Vec<Token>,
    pub diagnostics: Vec<Diagnostic>,
}

/// The scanner: applies a [`Dfa`] repeatedly over the source text.
pub struct Lexer<'d> {
    dfa: &'d Dfa,
}

impl<'d> Lexer<'d> {
    pub fn new(dfa: &'d Dfa) -> Self {
        Lexer { dfa }
    }

    /// Scan `input` into a token stream ending in EOF. Unrecognised
    /// characters are reported and skipped one at a time.
    pub fn lex(&self, input: &str) -> LexOutcome {
        let mut tokens = Vec::new();
        let mut diagnostics = Vec::new();

        let chars: Vec<char> = input.chars().collect();
        let mut pos = 0usize;
        let mut line = 1u32;
        let mut col = 1u32;

        while pos < chars.len() {
            let rest: String = chars[pos..].iter().collect();
            let (kind, consumed) = self.dfa.recognize(&rest);
            let start_line = line;
            let start_col = col;

            // Advance the cursor over what the machine walked.
            for &ch in &chars[pos..pos + consumed] {
                if ch == '\n' {
                    line += 1;
                    col = 1;
                } else {
                    col += 1;
                }
            }
            pos += consumed;

            match kind {
                Some(SKIP) => {}
                Some(kind) => {
                    let text: String = chars[pos - consumed..pos].iter().collect();
                    tokens.push(Token::new(
                        kind,
                        text,
                        Span::new(start_line, start_col, line, col),
                    ));
                }
                None => {
                    if pos < chars.len() {
                        // Swallow one more character so scanning can resume.
                        let ch = chars[pos];
                        diagnostics.push(Diagnostic::lexer(
                            Span::new(line, col, line, col + 1),
                            format!("unrecognized character '{}'", ch),
                        ));
                        if ch == '\n' {
                            line += 1;
                            col = 1;
                        } else {
                            col += 1;
                        }
                        pos += 1;
                    } else {
                        diagnostics.push(Diagnostic::lexer(
                            Span::new(start_line, start_col, line, col),
                            "unterminated token".to_string(),
                        ));
                    }
                }
            }
        }

        tokens.push(Token::eof(Span::point(line, col)));
        LexOutcome {
            tokens,
            diagnostics,
        }
    }
}

fn parse_count(field: &str) -> Result<usize, SyntaxError> {
    field.parse().map_err(|_| SyntaxError::MalformedDfa {
        reason: format!("'{}' is not a count", field),
    })
}
