//! Name resolution and type checking.
//!
//! One traversal over the AST. Declarations populate the scoped symbol
//! table; every expression gets a type annotation; implicit numeric
//! conversions are made explicit by wrapping the narrower side in a `Cast`
//! node. `int` widens to `float`; conditions of `if`/`while` are cast to the
//! internal `bool` type when they are plain numeric values.
//!
//! The checker never fails: unresolved or ill-typed expressions are reported
//! and given the `int` type so the traversal continues.

use lightrv_core::ast::{Decl, Expr, ExprKind, FuncDecl, Program, Stmt, VarDecl};
use lightrv_core::symbol::{ScopeId, Symbol, SymbolId, SymbolTable};
use lightrv_core::types::{self, BaseType, Type};
use lightrv_core::{Diagnostic, Span};

/// The populated symbol table plus accumulated diagnostics.
#[derive(Debug)]
pub struct CheckOutcome {
    pub table: SymbolTable,
    pub diagnostics: Vec<Diagnostic>,
}

/// Type-check `program` in place, annotating expressions and inserting casts.
pub fn check(program: &mut Program) -> CheckOutcome {
    let mut checker = Checker {
        table: SymbolTable::new(),
        scope: ScopeId::GLOBAL,
        current_func: None,
        diagnostics: Vec::new(),
    };
    checker.program(program);
    CheckOutcome {
        table: checker.table,
        diagnostics: checker.diagnostics,
    }
}

struct Checker {
    table: SymbolTable,
    scope: ScopeId,
    current_func: Option<SymbolId>,
    diagnostics: Vec<Diagnostic>,
}

impl Checker {
    fn err(&mut self, span: Span, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::semantic(span, message));
    }

    fn program(&mut self, program: &mut Program) {
        for decl in &mut program.decls {
            self.declare(decl);
        }
        // Free-floating statements later become the body of the implicit
        // `__main__`, so returns check against a void result.
        self.current_func = None;
        for stmt in &mut program.stmts {
            self.stmt(stmt);
        }
        program.scope = Some(ScopeId::GLOBAL);
    }

    /// Install a declaration in the current scope, returning its symbol.
    fn declare(&mut self, decl: &mut Decl) -> Option<SymbolId> {
        match decl {
            Decl::Var(v) => self.var_decl(v),
            Decl::Func(f) => self.func_decl(f),
        }
    }

    fn resolve_base(&mut self, decl_span: Span, name: &str) -> BaseType {
        match BaseType::from_name(name) {
            Some(b) => b,
            None => {
                self.err(decl_span, format!("unknown type: {}", name));
                BaseType::Int
            }
        }
    }

    fn var_decl(&mut self, v: &mut VarDecl) -> Option<SymbolId> {
        let base = self.resolve_base(v.span, &v.ty.name);

        let Some(name) = v.name.clone() else {
            // The unnamed formal of a function-typed parameter: no binding,
            // just a typed slot in the arena.
            if base == BaseType::Void {
                return None;
            }
            return Some(self.table.fresh(Symbol::var("", Type::Base(base))));
        };

        if base == BaseType::Void {
            self.err(v.span, format!("defining void type variable: {}", name));
            return None;
        }

        let ty = if v.len == 0 {
            Type::Base(base)
        } else {
            Type::Array {
                base,
                len: v.len,
            }
        };

        if self.table.declares(self.scope, &name) {
            self.err(v.span, format!("redefining variable: {}", name));
            return None;
        }
        let id = self.table.put(self.scope, Symbol::var(name, ty)).ok()?;
        v.symbol = Some(id);
        Some(id)
    }

    fn func_decl(&mut self, f: &mut FuncDecl) -> Option<SymbolId> {
        let ret = self.resolve_base(f.span, &f.ret.name);

        // Install the function before descending so recursive calls resolve.
        let id = if self.table.declares(self.scope, &f.name) {
            self.err(f.span, format!("redefining function: {}", f.name));
            self.table.fresh(Symbol::func(f.name.clone(), ret))
        } else {
            match self.table.put(self.scope, Symbol::func(f.name.clone(), ret)) {
                Ok(id) => id,
                Err(_) => return None,
            }
        };
        f.symbol = Some(id);

        let saved_func = self.current_func;
        let saved_scope = self.scope;
        self.current_func = Some(id);
        self.scope = self.table.new_child(saved_scope);

        for param in &mut f.params {
            if let Some(param_id) = self.declare(param) {
                if let Symbol::Func { is_param, .. } = self.table.symbol_mut(param_id) {
                    *is_param = true;
                }
                if let Symbol::Func { params, .. } = self.table.symbol_mut(id) {
                    params.push(param_id);
                }
            }
        }

        for decl in &mut f.decls {
            if let Decl::Func(_) = decl {
                self.err(
                    decl.span(),
                    format!("defining function within function body: {}", f.name),
                );
                continue;
            }
            if let Some(local_id) = self.declare(decl) {
                if let Symbol::Func { locals, .. } = self.table.symbol_mut(id) {
                    locals.push(local_id);
                }
            }
        }

        for stmt in &mut f.stmts {
            self.stmt(stmt);
        }

        f.scope = Some(self.scope);
        self.scope = saved_scope;
        self.current_func = saved_func;
        Some(id)
    }

    fn stmt(&mut self, stmt: &mut Stmt) {
        match stmt {
            Stmt::Assign { target, value, span } => {
                let span = *span;
                let val_ty = self.expr(value);

                if !matches!(target.kind, ExprKind::Id { .. } | ExprKind::Index { .. }) {
                    self.err(span, "assign target is not a valid lvalue");
                    return;
                }
                let var_ty = self.expr(target);

                if var_ty.is_array() {
                    self.err(span, "cannot assign to an array");
                    return;
                }
                if val_ty.is_array() {
                    self.err(span, "array cannot be assigned");
                    return;
                }
                if var_ty.is_func() {
                    self.err(span, "cannot assign to a function");
                    return;
                }
                if val_ty.is_func() {
                    self.err(span, "function cannot be assigned");
                    return;
                }
                if var_ty.is_void() || val_ty.is_void() {
                    self.err(span, "cannot assign void type");
                    return;
                }
                if var_ty != val_ty {
                    insert_cast(value, val_ty, var_ty);
                }
            }
            Stmt::If {
                cond,
                then_stmt,
                else_stmt,
                ..
            } => {
                let cond_ty = self.expr(cond);
                if cond_ty != types::BOOL {
                    insert_cast(cond, cond_ty, types::BOOL);
                }
                self.stmt(then_stmt);
                if let Some(else_stmt) = else_stmt {
                    self.stmt(else_stmt);
                }
            }
            Stmt::While { cond, body, .. } => {
                let cond_ty = self.expr(cond);
                if cond_ty != types::BOOL {
                    insert_cast(cond, cond_ty, types::BOOL);
                }
                self.stmt(body);
            }
            Stmt::Return { value, span } => {
                let span = *span;
                let ret = match self.current_func {
                    Some(id) => match self.table.symbol(id) {
                        Symbol::Func { ret, .. } => *ret,
                        Symbol::Var { .. } => BaseType::Void,
                    },
                    // Top-level statements run in the implicit void main.
                    None => BaseType::Void,
                };
                match value {
                    Some(value) => {
                        let val_ty = self.expr(value);
                        if ret == BaseType::Void
                            || val_ty.is_array()
                            || val_ty.is_func()
                            || val_ty.is_void()
                        {
                            self.err(span, "return type not compatible");
                            return;
                        }
                        let ret_ty = Type::Base(ret);
                        if val_ty != ret_ty {
                            insert_cast(value, val_ty, ret_ty);
                        }
                    }
                    None => {
                        if ret != BaseType::Void {
                            self.err(span, "return type not compatible");
                        }
                    }
                }
            }
            Stmt::Block { body, .. } => {
                // Blocks do not open a scope: declarations are not legal
                // inside them.
                for stmt in body {
                    self.stmt(stmt);
                }
            }
            Stmt::ExprEval { expr, .. } => {
                self.expr(expr);
            }
        }
    }

    /// Infer and annotate the type of an expression.
    fn expr(&mut self, expr: &mut Expr) -> Type {
        let span = expr.span;
        let ty = match &mut expr.kind {
            ExprKind::Int(_) => types::INT,
            ExprKind::Float(_) => types::FLOAT,
            ExprKind::Id { name, symbol } => {
                let name = name.clone();
                match self.table.get_recursive(self.scope, &name) {
                    Some(id) => {
                        *symbol = Some(id);
                        self.table.type_of(id)
                    }
                    None => {
                        self.err(span, format!("undeclared variable: {}", name));
                        types::INT
                    }
                }
            }
            ExprKind::Binary { .. } => return self.binary(expr),
            ExprKind::Call { .. } => return self.call(expr),
            ExprKind::Index { .. } => return self.index(expr),
            ExprKind::Cast { to, .. } => to.clone(),
        };
        expr.ty = Some(ty.clone());
        ty
    }

    fn binary(&mut self, expr: &mut Expr) -> Type {
        let span = expr.span;
        let ExprKind::Binary { op, left, right } = &mut expr.kind else {
            return types::INT;
        };
        let op = *op;
        let mut lhs = self.expr(left);
        let mut rhs = self.expr(right);

        if lhs.is_array() || lhs.is_func() {
            self.err(span, "left operand type not compatible in binary expression");
            lhs = types::INT;
        }
        if rhs.is_array() || rhs.is_func() {
            self.err(span, "right operand type not compatible in binary expression");
            rhs = types::INT;
        }
        if lhs.is_void() || rhs.is_void() {
            self.err(span, "void type not compatible in binary expression");
            lhs = types::INT;
            rhs = types::INT;
        }

        // The integer side widens to match the other operand.
        if lhs != rhs {
            if lhs.is_int() {
                insert_cast(left, lhs, rhs.clone());
                lhs = rhs.clone();
            } else if rhs.is_int() {
                insert_cast(right, rhs, lhs.clone());
            }
        }

        let ty = if op.is_comparison() { types::BOOL } else { lhs };
        expr.ty = Some(ty.clone());
        ty
    }

    fn call(&mut self, expr: &mut Expr) -> Type {
        let span = expr.span;
        let ExprKind::Call {
            callee,
            args,
            symbol,
        } = &mut expr.kind
        else {
            return types::INT;
        };
        let callee = callee.clone();

        let Some(id) = self.table.get_recursive(self.scope, &callee) else {
            self.err(span, format!("undeclared function: {}", callee));
            expr.ty = Some(types::INT);
            return types::INT;
        };
        let Symbol::Func { ret, params, .. } = self.table.symbol(id) else {
            self.err(span, format!("not a function: {}", callee));
            expr.ty = Some(types::INT);
            return types::INT;
        };
        let ret = *ret;
        let params = params.clone();
        *symbol = Some(id);

        if params.len() != args.len() {
            self.err(
                span,
                format!(
                    "function arguments doesn't match: expecting {}, actual {}",
                    params.len(),
                    args.len()
                ),
            );
            expr.ty = Some(Type::Base(ret));
            return Type::Base(ret);
        }

        let param_tys: Vec<Type> = params.iter().map(|p| self.table.type_of(*p)).collect();
        for (arg, param_ty) in args.iter_mut().zip(param_tys) {
            let arg_ty = self.expr(arg);
            if arg_ty.is_base() && param_ty.is_base() {
                if arg_ty.is_void() || param_ty.is_void() {
                    self.err(span, "void type cannot be used as argument");
                } else if arg_ty != param_ty {
                    insert_cast(arg, arg_ty, param_ty);
                }
            } else if arg_ty != param_ty {
                self.err(span, "argument type doesn't match");
            }
        }

        expr.ty = Some(Type::Base(ret));
        Type::Base(ret)
    }

    fn index(&mut self, expr: &mut Expr) -> Type {
        let span = expr.span;
        let ExprKind::Index { array, index } = &mut expr.kind else {
            return types::INT;
        };
        let receiver_ty = self.expr(array);

        let Type::Array { base, .. } = receiver_ty.clone() else {
            let name = match &array.kind {
                ExprKind::Id { name, .. } => name.clone(),
                _ => String::new(),
            };
            self.err(span, format!("not an array: {}", name));
            expr.ty = Some(types::INT);
            return types::INT;
        };

        match index {
            Some(index) => {
                let index_ty = self.expr(index);
                if index_ty != types::INT {
                    self.err(span, "dimension is not integer");
                }
                expr.ty = Some(Type::Base(base));
                Type::Base(base)
            }
            // A whole array named as an argument keeps its array type.
            None => {
                expr.ty = Some(receiver_ty.clone());
                receiver_ty
            }
        }
    }
}

/// Wrap `expr` in a `Cast` from `from` to `to`.
fn insert_cast(expr: &mut Expr, from: Type, to: Type) {
    let span = expr.span;
    let inner = std::mem::replace(expr, Expr::new(ExprKind::Int(0), span));
    *expr = Expr {
        kind: ExprKind::Cast {
            from,
            to: to.clone(),
            inner: Box::new(inner),
        },
        ty: Some(to),
        span,
    };
}
