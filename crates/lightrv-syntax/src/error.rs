//! Unrecoverable front-end errors.
//!
//! These cover malformed grammar or DFA table files, which abort compiler
//! start-up. Source-level lex and parse errors are accumulated
//! [`lightrv_core::Diagnostic`]s instead.

use thiserror::Error;

/// Errors loading the external grammar or DFA tables.
#[derive(Debug, Error)]
pub enum SyntaxError {
    /// The grammar file contained no productions before the terminating
    /// blank line.
    #[error("grammar is empty")]
    EmptyGrammar,

    /// The DFA file was truncated or a count field was not a number.
    #[error("malformed DFA table: {reason}")]
    MalformedDfa { reason: String },

    /// The DFA start state is not a member of the state set.
    #[error("DFA start state '{state}' is not in the state set")]
    UnknownStartState { state: String },

    /// The DFA accept set is empty.
    #[error("DFA has no accepting states")]
    NoAcceptStates,

    /// An accepting state is not a member of the state set.
    #[error("DFA accepting state '{state}' is not in the state set")]
    UnknownAcceptState { state: String },

    /// A transition pattern failed to compile as a regular expression.
    #[error("invalid DFA transition pattern '{pattern}': {reason}")]
    BadPattern { pattern: String, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
