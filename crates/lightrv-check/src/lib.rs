//! Semantic analysis: parse tree to AST lowering, name resolution and type
//! checking.
//!
//! Both passes accumulate `Semantic` diagnostics and run to completion
//! wherever they can make progress; ill-typed or unresolved expressions are
//! given the `int` type so traversal continues.

pub mod ast_build;
pub mod printer;
pub mod typecheck;

pub use ast_build::{build, BuildOutcome};
pub use typecheck::{check, CheckOutcome};
