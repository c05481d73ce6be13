//! AST to IR lowering.
//!
//! One traversal of the typed AST. Every local gets an entry-block `alloc`;
//! parameters are spilled into fresh slots on entry and the parameter name
//! is rebound to the slot, so the body only ever loads through pointers.
//! Free-floating program statements become the body of the generated
//! `__main__` of type `() -> void`.
//!
//! Temporaries are numbered `%1, %2, …` and labels `.L1, .L2, …` with
//! program-wide counters, so every label in the final assembly file is
//! unique.

use std::collections::BTreeSet;

use lightrv_core::ast::{Decl, Expr, ExprKind, Program, Stmt};
use lightrv_core::symbol::SymbolTable;
use lightrv_core::types::{self, BaseType, Type};
use lightrv_core::ScopeStack;

use crate::ir::{BasicBlock, IrFunc, IrGlobal, IrId, IrInstr, IrProgram, IrSym, IrValue};

/// Lower a checked program to IR.
pub fn lower(program: &Program, table: &SymbolTable) -> IrProgram {
    let mut b = Lowering {
        table,
        syms: Vec::new(),
        globals: Vec::new(),
        functions: Vec::new(),
        env: ScopeStack::new(),
        func_index: Vec::new(),
        temp_id: 0,
        label_id: 0,
    };
    b.program(program);
    b.finish()
}

/// Blocks of the function currently being built.
struct FnCtx {
    blocks: Vec<BasicBlock>,
    current: BasicBlock,
}

impl FnCtx {
    fn new(entry: IrId) -> Self {
        FnCtx {
            blocks: Vec::new(),
            current: BasicBlock::new(entry),
        }
    }

    fn push(&mut self, instr: IrInstr) {
        self.current.push(instr);
    }

    /// Seal the current block and continue in a new one labelled `label`.
    fn start_block(&mut self, label: IrId) {
        let next = BasicBlock::new(label);
        let done = std::mem::replace(&mut self.current, next);
        self.blocks.push(done);
    }

    fn finish(mut self) -> Vec<BasicBlock> {
        self.blocks.push(self.current);
        self.blocks
    }
}

struct Lowering<'a> {
    table: &'a SymbolTable,
    syms: Vec<IrSym>,
    globals: Vec<IrGlobal>,
    functions: Vec<IrFunc>,
    /// Name environment: `%name` and `@name` to arena ids.
    env: ScopeStack<IrId>,
    /// Function names in lowering order, for resolving direct call targets.
    func_index: Vec<String>,
    temp_id: u32,
    label_id: u32,
}

impl<'a> Lowering<'a> {
    fn new_sym(&mut self, name: String, ty: Type) -> IrId {
        let id = IrId(self.syms.len() as u32);
        self.syms.push(IrSym {
            name,
            ty,
            storage: None,
        });
        id
    }

    fn temp(&mut self, ty: Type) -> IrId {
        self.temp_id += 1;
        self.new_sym(format!("%{}", self.temp_id), ty)
    }

    fn label(&mut self) -> IrId {
        self.label_id += 1;
        self.new_sym(format!(".L{}", self.label_id), types::LABEL)
    }

    fn finish(self) -> IrProgram {
        let mut prog = IrProgram {
            syms: self.syms,
            globals: self.globals,
            functions: self.functions,
        };
        // Record which functions each function calls directly.
        for func in &mut prog.functions {
            let mut calls = BTreeSet::new();
            for block in &func.blocks {
                for instr in &block.instrs {
                    if let IrInstr::Call {
                        callee_func: Some(idx),
                        ..
                    } = instr
                    {
                        calls.insert(*idx);
                    }
                }
            }
            func.calls = calls;
        }
        prog
    }

    fn program(&mut self, program: &Program) {
        // Function indices are assigned up front so recursive and forward
        // call sites can name their target while it is still being built.
        for decl in &program.decls {
            if let Decl::Func(f) = decl {
                if f.symbol.is_some() {
                    self.func_index.push(f.name.clone());
                }
            }
        }

        for decl in &program.decls {
            match decl {
                Decl::Var(v) => {
                    let Some(sym_id) = v.symbol else { continue };
                    let ty = self.table.type_of(sym_id);
                    let name = format!("@{}", self.table.symbol(sym_id).name());
                    let global = self.new_sym(name.clone(), Type::pointer(ty.clone()));
                    self.globals.push(IrGlobal { sym: global, ty });
                    self.env.insert(name, global);
                }
                Decl::Func(f) => self.function(f),
            }
        }

        // Implicit main around the free-floating statements.
        let main_sym = self.new_sym(
            "@__main__".to_string(),
            Type::Func {
                ret: BaseType::Void,
                params: Vec::new(),
            },
        );
        self.env.insert("@__main__".to_string(), main_sym);
        let entry = self.label();
        let mut ctx = FnCtx::new(entry);
        self.env.push();
        for stmt in &program.stmts {
            self.stmt(&mut ctx, stmt);
        }
        ctx.push(IrInstr::Ret { value: None });
        let epilogue_label = self.label();
        self.env.pop();
        self.functions.push(IrFunc {
            sym: main_sym,
            params: Vec::new(),
            blocks: ctx.finish(),
            entry: Vec::new(),
            epilogue_label,
            epilogue: Vec::new(),
            frame_size: 0,
            param_area: 0,
            calls: BTreeSet::new(),
        });
    }

    /// The value type a parameter is passed as: arrays and functions are
    /// passed by address.
    fn param_value_type(ty: &Type) -> Type {
        match ty {
            Type::Array { .. } | Type::Func { .. } => Type::pointer(ty.clone()),
            _ => ty.clone(),
        }
    }

    fn function(&mut self, f: &lightrv_core::ast::FuncDecl) {
        let Some(func_id) = f.symbol else { return };
        let func_ty = self.table.type_of(func_id);
        let name = format!("@{}", f.name);
        let func_sym = self.new_sym(name.clone(), func_ty);
        self.env.insert(name, func_sym);

        let param_ids = match self.table.symbol(func_id) {
            lightrv_core::symbol::Symbol::Func { params, .. } => params.clone(),
            _ => Vec::new(),
        };

        let mut params = Vec::new();
        for pid in &param_ids {
            let pname = self.table.symbol(*pid).name().to_string();
            let value_ty = Self::param_value_type(&self.table.type_of(*pid));
            params.push(self.new_sym(format!("@{}", pname), value_ty));
        }

        self.env.push();
        let entry = self.label();
        let mut ctx = FnCtx::new(entry);

        // Spill every parameter into a fresh slot and rebind its name, so
        // the body uses the same load/store discipline as locals.
        for (pid, psym) in param_ids.iter().zip(params.clone()) {
            let pname = self.table.symbol(*pid).name().to_string();
            self.env.insert(format!("@{}", pname), psym);
            let value_ty = self.syms[psym.0 as usize].ty.clone();
            let slot = self.new_sym(format!("%{}", pname), Type::pointer(value_ty.clone()));
            self.env.insert(format!("%{}", pname), slot);
            ctx.push(IrInstr::Alloc {
                dst: slot,
                ty: value_ty,
                position: None,
            });
            ctx.push(IrInstr::Store {
                src: IrValue::Sym(psym),
                dst: slot,
            });
        }

        for decl in &f.decls {
            let Decl::Var(v) = decl else { continue };
            let Some(sym_id) = v.symbol else { continue };
            let var_ty = self.table.type_of(sym_id);
            let vname = self.table.symbol(sym_id).name().to_string();
            let slot = self.new_sym(format!("%{}", vname), Type::pointer(var_ty.clone()));
            self.env.insert(format!("%{}", vname), slot);
            ctx.push(IrInstr::Alloc {
                dst: slot,
                ty: var_ty,
                position: None,
            });
        }

        for stmt in &f.stmts {
            self.stmt(&mut ctx, stmt);
        }
        ctx.push(IrInstr::Ret { value: None });
        let epilogue_label = self.label();
        self.env.pop();

        self.functions.push(IrFunc {
            sym: func_sym,
            params,
            blocks: ctx.finish(),
            entry: Vec::new(),
            epilogue_label,
            epilogue: Vec::new(),
            frame_size: 0,
            param_area: 0,
            calls: BTreeSet::new(),
        });
    }

    /// Resolve a name to its address symbol: the local `%name` slot first,
    /// then the global `@name`.
    fn resolve(&self, name: &str) -> Option<IrId> {
        if let Some(id) = self.env.get(&format!("%{}", name)) {
            return Some(*id);
        }
        self.env.get_recursive(&format!("@{}", name)).copied()
    }

    /// The register-facing base pointer for indexing: a slot that itself
    /// holds a pointer (an array parameter) is loaded first.
    fn elptr_base(&mut self, ctx: &mut FnCtx, arr: IrId) -> IrId {
        let ty = self.syms[arr.0 as usize].ty.clone();
        if let Some(inner) = ty.pointee() {
            if matches!(inner, Type::Pointer(_)) {
                let dst = self.temp(inner.clone());
                ctx.push(IrInstr::Load { dst, src: arr });
                return dst;
            }
        }
        arr
    }

    fn stmt(&mut self, ctx: &mut FnCtx, stmt: &Stmt) {
        match stmt {
            Stmt::Assign { target, value, .. } => {
                let val = self.expr(ctx, value);
                match &target.kind {
                    ExprKind::Id { name, .. } => {
                        if let Some(dst) = self.resolve(name) {
                            ctx.push(IrInstr::Store { src: val, dst });
                        }
                    }
                    ExprKind::Index {
                        array,
                        index: Some(index),
                    } => {
                        let idx = self.expr(ctx, index);
                        let ExprKind::Id { name, .. } = &array.kind else {
                            return;
                        };
                        let Some(arr) = self.resolve(name) else {
                            return;
                        };
                        let base = self.elptr_base(ctx, arr);
                        let el = self.temp(Type::pointer(target.ty()));
                        ctx.push(IrInstr::GetElPtr {
                            dst: el,
                            base,
                            offset: idx,
                        });
                        ctx.push(IrInstr::Store { src: val, dst: el });
                    }
                    _ => {}
                }
            }
            Stmt::If {
                cond,
                then_stmt,
                else_stmt,
                ..
            } => {
                let cond_val = self.expr(ctx, cond);
                match else_stmt {
                    None => {
                        let then_label = self.label();
                        let end_label = self.label();
                        ctx.push(IrInstr::Br {
                            cond: cond_val,
                            then_label,
                            else_label: end_label,
                        });
                        ctx.start_block(then_label);
                        self.stmt(ctx, then_stmt);
                        ctx.push(IrInstr::Jump { label: end_label });
                        ctx.start_block(end_label);
                    }
                    Some(else_stmt) => {
                        let then_label = self.label();
                        let else_label = self.label();
                        let end_label = self.label();
                        ctx.push(IrInstr::Br {
                            cond: cond_val,
                            then_label,
                            else_label,
                        });
                        ctx.start_block(then_label);
                        self.stmt(ctx, then_stmt);
                        ctx.push(IrInstr::Jump { label: end_label });
                        ctx.start_block(else_label);
                        self.stmt(ctx, else_stmt);
                        ctx.push(IrInstr::Jump { label: end_label });
                        ctx.start_block(end_label);
                    }
                }
            }
            Stmt::While { cond, body, .. } => {
                // The condition lives in a header block that both the entry
                // fall-through and the back edge jump to, so it is re-tested
                // on every iteration.
                let cond_label = self.label();
                let body_label = self.label();
                let end_label = self.label();
                ctx.push(IrInstr::Jump { label: cond_label });
                ctx.start_block(cond_label);
                let cond_val = self.expr(ctx, cond);
                ctx.push(IrInstr::Br {
                    cond: cond_val,
                    then_label: body_label,
                    else_label: end_label,
                });
                ctx.start_block(body_label);
                self.stmt(ctx, body);
                ctx.push(IrInstr::Jump { label: cond_label });
                ctx.start_block(end_label);
            }
            Stmt::Return { value, .. } => {
                let val = value.as_ref().map(|v| self.expr(ctx, v));
                ctx.push(IrInstr::Ret { value: val });
                // A fresh block receives any (dead) trailing instructions.
                let label = self.label();
                ctx.start_block(label);
            }
            Stmt::Block { body, .. } => {
                for stmt in body {
                    self.stmt(ctx, stmt);
                }
            }
            Stmt::ExprEval { expr, .. } => {
                if let ExprKind::Call { .. } = expr.kind {
                    self.call(ctx, expr, false);
                } else {
                    self.expr(ctx, expr);
                }
            }
        }
    }

    fn expr(&mut self, ctx: &mut FnCtx, expr: &Expr) -> IrValue {
        match &expr.kind {
            ExprKind::Int(v) => IrValue::Int(*v),
            ExprKind::Float(v) => IrValue::Float(*v),
            ExprKind::Id { name, .. } => self.id(ctx, expr, name),
            ExprKind::Index { array, index } => match index {
                Some(index) => {
                    let dst = self.temp(expr.ty());
                    let idx = self.expr(ctx, index);
                    let ExprKind::Id { name, .. } = &array.kind else {
                        return IrValue::Sym(dst);
                    };
                    let Some(arr) = self.resolve(name) else {
                        return IrValue::Sym(dst);
                    };
                    let base = self.elptr_base(ctx, arr);
                    let el = self.temp(Type::pointer(expr.ty()));
                    ctx.push(IrInstr::GetElPtr {
                        dst: el,
                        base,
                        offset: idx,
                    });
                    ctx.push(IrInstr::Load { dst, src: el });
                    IrValue::Sym(dst)
                }
                // A whole array named as an argument passes its address.
                None => {
                    let ExprKind::Id { name, .. } = &array.kind else {
                        return IrValue::Int(0);
                    };
                    match self.resolve(name) {
                        Some(arr) => {
                            let base = self.elptr_base(ctx, arr);
                            IrValue::Sym(base)
                        }
                        None => IrValue::Int(0),
                    }
                }
            },
            ExprKind::Binary { op, left, right } => {
                let lhs = self.expr(ctx, left);
                let rhs = self.expr(ctx, right);
                let dst = self.temp(expr.ty());
                ctx.push(IrInstr::Binary {
                    dst,
                    op: *op,
                    lhs,
                    rhs,
                });
                IrValue::Sym(dst)
            }
            ExprKind::Call { .. } => self.call(ctx, expr, true),
            ExprKind::Cast { from, to, inner } => {
                let dst = self.temp(to.clone());
                let val = self.expr(ctx, inner);
                if *to == types::BOOL {
                    // Truth test: compare against the typed zero.
                    let zero = if from.is_float() {
                        IrValue::Float(0.0)
                    } else {
                        IrValue::Int(0)
                    };
                    ctx.push(IrInstr::Binary {
                        dst,
                        op: lightrv_core::ast::BinOp::Ne,
                        lhs: val,
                        rhs: zero,
                    });
                } else if *to == types::INT && from.is_float() {
                    ctx.push(IrInstr::F2I { dst, src: val });
                } else if *to == types::FLOAT && from.is_int() {
                    ctx.push(IrInstr::I2F { dst, src: val });
                } else {
                    return val;
                }
                IrValue::Sym(dst)
            }
        }
    }

    fn id(&mut self, ctx: &mut FnCtx, expr: &Expr, name: &str) -> IrValue {
        let Some(addr) = self.resolve(name) else {
            return IrValue::Int(0);
        };
        let addr_ty = self.syms[addr.0 as usize].ty.clone();

        // Arrays are values only as addresses.
        if expr.ty().is_array() {
            let base = self.elptr_base(ctx, addr);
            return IrValue::Sym(base);
        }
        // A global function named as a value is its label.
        if addr_ty.is_func() {
            return IrValue::Sym(addr);
        }

        let value_ty = addr_ty.pointee().cloned().unwrap_or_else(|| expr.ty());
        let dst = self.temp(value_ty);
        ctx.push(IrInstr::Load { dst, src: addr });
        IrValue::Sym(dst)
    }

    fn call(&mut self, ctx: &mut FnCtx, expr: &Expr, want_result: bool) -> IrValue {
        let ExprKind::Call { callee, args, .. } = &expr.kind else {
            return IrValue::Int(0);
        };

        let ret_ty = expr.ty();
        let result = if want_result && !ret_ty.is_void() {
            Some(self.temp(ret_ty))
        } else {
            None
        };

        let arg_vals: Vec<IrValue> = args.iter().map(|a| self.expr(ctx, a)).collect();

        let local_key = format!("%{}", callee);
        if let Some(&slot) = self.env.get(&local_key) {
            // Calling through a function-typed parameter: load the address
            // out of its slot and call indirectly.
            let slot_ty = self.syms[slot.0 as usize].ty.clone();
            let addr_ty = slot_ty.pointee().cloned().unwrap_or(slot_ty);
            let addr = self.temp(addr_ty);
            ctx.push(IrInstr::Load { dst: addr, src: slot });
            ctx.push(IrInstr::Call {
                result,
                callee: addr,
                args: arg_vals,
                callee_func: None,
            });
        } else if let Some(&label) = self.env.get_recursive(&format!("@{}", callee)) {
            let callee_func = self.func_index.iter().position(|n| n == callee);
            ctx.push(IrInstr::Call {
                result,
                callee: label,
                args: arg_vals,
                callee_func,
            });
        }

        match result {
            Some(id) => IrValue::Sym(id),
            None => IrValue::Int(0),
        }
    }
}
