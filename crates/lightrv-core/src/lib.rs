pub mod ast;
pub mod diag;
pub mod error;
pub mod parse_tree;
pub mod scope;
pub mod span;
pub mod symbol;
pub mod token;
pub mod types;

// Re-export commonly used types
pub use ast::{BinOp, Decl, Expr, ExprKind, FuncDecl, Program, Stmt, TypeName, VarDecl};
pub use diag::{Diagnostic, Stage};
pub use error::CoreError;
pub use parse_tree::ParseTree;
pub use scope::ScopeStack;
pub use span::Span;
pub use symbol::{ScopeId, Symbol, SymbolId, SymbolTable};
pub use token::Token;
pub use types::{BaseType, Type};
