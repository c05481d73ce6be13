//! Syntax front end: grammar tables, SLR(1) construction, LR parsing and the
//! table-driven scanner.
//!
//! The grammar and the scanner's DFA are external text files; this crate
//! loads them, builds the SLR(1) ACTION/GOTO tables, and drives the token
//! stream to a concrete parse tree with panic-mode recovery.

pub mod error;
pub mod grammar;
pub mod lexer;
pub mod parser;
pub mod slr;

pub use error::SyntaxError;
pub use grammar::{Grammar, Production, EOF_SYMBOL, EPSILON};
pub use lexer::{Dfa, LexOutcome, Lexer};
pub use parser::{LrParser, ParseOutcome};
pub use slr::{Action, Conflict, ConflictKind, ParseTable};
