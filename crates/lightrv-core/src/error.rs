//! Core error types.
//!
//! Uses `thiserror` for structured, matchable variants. These cover internal
//! misuse of the core data model; source-level compile errors are
//! [`crate::diag::Diagnostic`] values instead.

use thiserror::Error;

/// Errors produced by the core data model.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A name was inserted into a scope frame that already declares it.
    #[error("redefinition of '{name}'")]
    Redefinition { name: String },

    /// A scope id does not exist in the symbol table.
    #[error("unknown scope: {index}")]
    UnknownScope { index: u32 },

    /// A symbol id does not exist in the symbol table.
    #[error("unknown symbol: {index}")]
    UnknownSymbol { index: u32 },
}
