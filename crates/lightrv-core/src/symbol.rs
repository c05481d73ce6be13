//! Symbols and the scoped symbol table.
//!
//! Symbols live in a single arena owned by [`SymbolTable`]; scopes form a
//! tree of frames whose bindings map names to [`SymbolId`]s. AST nodes store
//! symbol identities, never the symbols themselves, so resolution is a weak
//! back-reference into the table.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{BaseType, Type};

/// Stable symbol identifier into the table's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolId(pub u32);

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable scope identifier. Scope 0 is the global frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeId(pub u32);

impl ScopeId {
    pub const GLOBAL: ScopeId = ScopeId(0);
}

/// A declared entity: a variable or a function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Symbol {
    Var {
        name: String,
        ty: Type,
    },
    Func {
        name: String,
        ret: BaseType,
        params: Vec<SymbolId>,
        locals: Vec<SymbolId>,
        /// Function-typed formals are first-class values at call sites.
        is_param: bool,
    },
}

impl Symbol {
    pub fn var(name: impl Into<String>, ty: Type) -> Self {
        Symbol::Var {
            name: name.into(),
            ty,
        }
    }

    pub fn func(name: impl Into<String>, ret: BaseType) -> Self {
        Symbol::Func {
            name: name.into(),
            ret,
            params: Vec::new(),
            locals: Vec::new(),
            is_param: false,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Symbol::Var { name, .. } => name,
            Symbol::Func { name, .. } => name,
        }
    }

    pub fn is_func(&self) -> bool {
        matches!(self, Symbol::Func { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Scope {
    parent: Option<ScopeId>,
    names: IndexMap<String, SymbolId>,
}

/// Arena of symbols plus the scope tree over them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    scopes: Vec<Scope>,
}

impl SymbolTable {
    /// A table holding only the empty global scope.
    pub fn new() -> Self {
        SymbolTable {
            symbols: Vec::new(),
            scopes: vec![Scope {
                parent: None,
                names: IndexMap::new(),
            }],
        }
    }

    /// Open a child frame under `parent`.
    pub fn new_child(&mut self, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            parent: Some(parent),
            names: IndexMap::new(),
        });
        id
    }

    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.scopes.get(scope.0 as usize).and_then(|s| s.parent)
    }

    /// Does `scope`'s own frame bind `name`?
    pub fn declares(&self, scope: ScopeId, name: &str) -> bool {
        self.scopes
            .get(scope.0 as usize)
            .is_some_and(|s| s.names.contains_key(name))
    }

    /// Does `scope` or any ancestor bind `name`?
    pub fn declares_recursive(&self, scope: ScopeId, name: &str) -> bool {
        self.get_recursive(scope, name).is_some()
    }

    /// Look up `name` in `scope`'s own frame.
    pub fn get(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        self.scopes
            .get(scope.0 as usize)
            .and_then(|s| s.names.get(name))
            .copied()
    }

    /// Look up `name` walking from `scope` to the global frame.
    pub fn get_recursive(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        let mut cur = Some(scope);
        while let Some(id) = cur {
            let frame = self.scopes.get(id.0 as usize)?;
            if let Some(sym) = frame.names.get(name) {
                return Some(*sym);
            }
            cur = frame.parent;
        }
        None
    }

    /// Declare `symbol` in `scope`. Declaring a name twice in the same frame
    /// is a redefinition error, never a silent overwrite.
    pub fn put(&mut self, scope: ScopeId, symbol: Symbol) -> Result<SymbolId, CoreError> {
        if self.declares(scope, symbol.name()) {
            return Err(CoreError::Redefinition {
                name: symbol.name().to_string(),
            });
        }
        let name = symbol.name().to_string();
        let id = self.fresh(symbol);
        if let Some(frame) = self.scopes.get_mut(scope.0 as usize) {
            frame.names.insert(name, id);
        }
        Ok(id)
    }

    /// Add a symbol to the arena without binding a name. Used for unnamed
    /// formals of function-typed parameters.
    pub fn fresh(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(symbol);
        id
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.0 as usize]
    }

    /// The semantic type of a symbol. For functions this assembles the full
    /// signature from the parameter symbols.
    pub fn type_of(&self, id: SymbolId) -> Type {
        match self.symbol(id) {
            Symbol::Var { ty, .. } => ty.clone(),
            Symbol::Func { ret, params, .. } => Type::Func {
                ret: *ret,
                params: params.iter().map(|p| self.type_of(*p)).collect(),
            },
        }
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        SymbolTable::new()
    }
}
