//! AST pretty printer for the `.ast` sidecar.
//!
//! An indented structural dump of the checked tree, with inferred types in
//! brackets so the inserted casts are visible.

use std::fmt::Write;

use lightrv_core::ast::{Decl, Expr, ExprKind, Program, Stmt};

/// Render the typed AST as indented text.
pub fn render(program: &Program) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Program");
    for decl in &program.decls {
        decl_text(&mut out, decl, 1);
    }
    for stmt in &program.stmts {
        stmt_text(&mut out, stmt, 1);
    }
    out
}

fn pad(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn decl_text(out: &mut String, decl: &Decl, depth: usize) {
    pad(out, depth);
    match decl {
        Decl::Var(v) => {
            let name = v.name.as_deref().unwrap_or("_");
            match v.len {
                0 => {
                    let _ = writeln!(out, "VarDecl {} : {}", name, v.ty.name);
                }
                -1 => {
                    let _ = writeln!(out, "VarDecl {} : {}[]", name, v.ty.name);
                }
                n => {
                    let _ = writeln!(out, "VarDecl {} : {}[{}]", name, v.ty.name, n);
                }
            }
        }
        Decl::Func(f) => {
            let _ = writeln!(out, "FuncDecl {} : {}", f.name, f.ret.name);
            for param in &f.params {
                decl_text(out, param, depth + 1);
            }
            for local in &f.decls {
                decl_text(out, local, depth + 1);
            }
            for stmt in &f.stmts {
                stmt_text(out, stmt, depth + 1);
            }
        }
    }
}

fn stmt_text(out: &mut String, stmt: &Stmt, depth: usize) {
    pad(out, depth);
    match stmt {
        Stmt::Assign { target, value, .. } => {
            let _ = writeln!(out, "Assign");
            expr_text(out, target, depth + 1);
            expr_text(out, value, depth + 1);
        }
        Stmt::If {
            cond,
            then_stmt,
            else_stmt,
            ..
        } => {
            let _ = writeln!(out, "If");
            expr_text(out, cond, depth + 1);
            stmt_text(out, then_stmt, depth + 1);
            if let Some(else_stmt) = else_stmt {
                stmt_text(out, else_stmt, depth + 1);
            }
        }
        Stmt::While { cond, body, .. } => {
            let _ = writeln!(out, "While");
            expr_text(out, cond, depth + 1);
            stmt_text(out, body, depth + 1);
        }
        Stmt::Return { value, .. } => {
            let _ = writeln!(out, "Return");
            if let Some(value) = value {
                expr_text(out, value, depth + 1);
            }
        }
        Stmt::Block { body, .. } => {
            let _ = writeln!(out, "Block");
            for stmt in body {
                stmt_text(out, stmt, depth + 1);
            }
        }
        Stmt::ExprEval { expr, .. } => {
            let _ = writeln!(out, "ExprEval");
            expr_text(out, expr, depth + 1);
        }
    }
}

fn expr_text(out: &mut String, expr: &Expr, depth: usize) {
    pad(out, depth);
    let ty = expr.ty();
    match &expr.kind {
        ExprKind::Int(v) => {
            let _ = writeln!(out, "Int {} [{}]", v, ty);
        }
        ExprKind::Float(v) => {
            let _ = writeln!(out, "Float {} [{}]", v, ty);
        }
        ExprKind::Id { name, .. } => {
            let _ = writeln!(out, "Id {} [{}]", name, ty);
        }
        ExprKind::Index { array, index } => {
            let _ = writeln!(out, "Index [{}]", ty);
            expr_text(out, array, depth + 1);
            if let Some(index) = index {
                expr_text(out, index, depth + 1);
            }
        }
        ExprKind::Binary { op, left, right } => {
            let _ = writeln!(out, "Binary {} [{}]", op.mnemonic(), ty);
            expr_text(out, left, depth + 1);
            expr_text(out, right, depth + 1);
        }
        ExprKind::Call { callee, args, .. } => {
            let _ = writeln!(out, "Call {} [{}]", callee, ty);
            for arg in args {
                expr_text(out, arg, depth + 1);
            }
        }
        ExprKind::Cast { from, to, inner } => {
            let _ = writeln!(out, "Cast {} -> {}", from, to);
            expr_text(out, inner, depth + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lightrv_core::ast::{TypeName, VarDecl};
    use lightrv_core::Span;

    #[test]
    fn renders_declarations_and_statements() {
        let program = Program {
            decls: vec![Decl::Var(VarDecl {
                ty: TypeName {
                    name: "int".to_string(),
                    span: Span::default(),
                },
                name: Some("x".to_string()),
                len: 3,
                symbol: None,
                span: Span::default(),
            })],
            stmts: vec![Stmt::Return {
                value: None,
                span: Span::default(),
            }],
            scope: None,
            span: Span::default(),
        };
        let text = render(&program);
        assert!(text.contains("VarDecl x : int[3]"));
        assert!(text.contains("Return"));
    }
}
