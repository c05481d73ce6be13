//! Parse tree to AST lowering.
//!
//! A pure structural translation keyed on the non-terminal name and the node
//! shape (child count, discriminating child symbols). Positions are copied
//! out of the parse tree, so the tree can be dropped as soon as building
//! finishes.

use lightrv_core::ast::{BinOp, Decl, Expr, ExprKind, FuncDecl, Program, Stmt, TypeName, VarDecl};
use lightrv_core::{Diagnostic, ParseTree};

/// The built program plus accumulated diagnostics.
#[derive(Debug)]
pub struct BuildOutcome {
    pub program: Option<Program>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Lower a concrete parse tree rooted at `Program` into the AST.
pub fn build(tree: &ParseTree) -> BuildOutcome {
    let mut b = Builder {
        diagnostics: Vec::new(),
    };
    let program = b.program(tree);
    if program.is_none() && b.diagnostics.is_empty() {
        b.diagnostics.push(Diagnostic::semantic(
            tree.span,
            "malformed parse tree".to_string(),
        ));
    }
    BuildOutcome {
        program,
        diagnostics: b.diagnostics,
    }
}

struct Builder {
    diagnostics: Vec<Diagnostic>,
}

impl Builder {
    fn err(&mut self, node: &ParseTree, message: impl Into<String>) {
        self.diagnostics
            .push(Diagnostic::semantic(node.span, message));
    }

    fn program(&mut self, node: &ParseTree) -> Option<Program> {
        // The accepting production may wrap Program in an augmented start
        // symbol; unwrap single-child layers until the Program node.
        let mut node = node;
        while node.symbol != "Program" && node.children.len() == 1 {
            node = &node.children[0];
        }
        if node.symbol != "Program" || node.children.len() != 2 {
            return None;
        }
        let decls = self.decl_list(&node.children[0]);
        let stmts = self.stmt_list(&node.children[1]);
        Some(Program {
            decls,
            stmts,
            scope: None,
            span: node.span,
        })
    }

    /// `Decls -> Decls Decl SCO | ε`
    fn decl_list(&mut self, node: &ParseTree) -> Vec<Decl> {
        let mut out = Vec::new();
        if node.symbol == "Decls" && node.children.len() == 3 {
            out = self.decl_list(&node.children[0]);
            if let Some(decl) = self.decl(&node.children[1]) {
                out.push(decl);
            }
        }
        out
    }

    /// `Stmts -> Stmt | Stmts SCO Stmt`
    fn stmt_list(&mut self, node: &ParseTree) -> Vec<Stmt> {
        let mut out = Vec::new();
        if node.symbol != "Stmts" {
            return out;
        }
        match node.children.len() {
            1 => {
                if let Some(stmt) = self.stmt(&node.children[0]) {
                    out.push(stmt);
                }
            }
            3 => {
                out = self.stmt_list(&node.children[0]);
                if let Some(stmt) = self.stmt(&node.children[2]) {
                    out.push(stmt);
                }
            }
            _ => {}
        }
        out
    }

    /// `Params -> Params Param SCO | ε`
    fn param_list(&mut self, node: &ParseTree) -> Vec<Decl> {
        let mut out = Vec::new();
        if node.symbol == "Params" && node.children.len() == 3 {
            out = self.param_list(&node.children[0]);
            if let Some(param) = self.param(&node.children[1]) {
                out.push(param);
            }
        }
        out
    }

    /// `Args -> Args Arg CMA | ε`
    fn arg_list(&mut self, node: &ParseTree) -> Vec<Expr> {
        let mut out = Vec::new();
        if node.symbol == "Args" && node.children.len() == 3 {
            out = self.arg_list(&node.children[0]);
            if let Some(arg) = self.arg(&node.children[1]) {
                out.push(arg);
            }
        }
        out
    }

    fn type_name(&mut self, node: &ParseTree) -> TypeName {
        let name = node
            .children
            .first()
            .map(|c| c.text().to_string())
            .unwrap_or_default();
        TypeName {
            name,
            span: node.span,
        }
    }

    fn decl(&mut self, node: &ParseTree) -> Option<Decl> {
        match node.children.len() {
            // Type ID
            2 => {
                let ty = self.type_name(&node.children[0]);
                Some(Decl::Var(VarDecl {
                    ty,
                    name: Some(node.children[1].text().to_string()),
                    len: 0,
                    symbol: None,
                    span: node.span,
                }))
            }
            // Type ID LBK NUM RBK
            5 => {
                let ty = self.type_name(&node.children[0]);
                let mut len = self.int_lexeme(&node.children[3]);
                if len <= 0 {
                    self.err(node, "dimension is not positive");
                    len = 1;
                }
                Some(Decl::Var(VarDecl {
                    ty,
                    name: Some(node.children[1].text().to_string()),
                    len,
                    symbol: None,
                    span: node.span,
                }))
            }
            // Type ID LPA Params RPA LBR Decls Stmts RBR
            9 => {
                let ret = self.type_name(&node.children[0]);
                let name = node.children[1].text().to_string();
                let params = self.param_list(&node.children[3]);
                let decls = self.decl_list(&node.children[6]);
                let stmts = self.stmt_list(&node.children[7]);
                Some(Decl::Func(FuncDecl {
                    ret,
                    name,
                    params,
                    decls,
                    stmts,
                    scope: None,
                    symbol: None,
                    span: node.span,
                }))
            }
            _ => None,
        }
    }

    fn param(&mut self, node: &ParseTree) -> Option<Decl> {
        match node.children.len() {
            // Type ID
            2 => {
                let ty = self.type_name(&node.children[0]);
                Some(Decl::Var(VarDecl {
                    ty,
                    name: Some(node.children[1].text().to_string()),
                    len: 0,
                    symbol: None,
                    span: node.span,
                }))
            }
            // Type ID LBK RBK: array parameter of unknown size
            4 => {
                let ty = self.type_name(&node.children[0]);
                Some(Decl::Var(VarDecl {
                    ty,
                    name: Some(node.children[1].text().to_string()),
                    len: -1,
                    symbol: None,
                    span: node.span,
                }))
            }
            // Type ID LPA Type RPA: function-typed parameter, modelled as a
            // function declaration with a single unnamed formal.
            5 => {
                let ret = self.type_name(&node.children[0]);
                let name = node.children[1].text().to_string();
                let inner_ty = self.type_name(&node.children[3]);
                let inner = Decl::Var(VarDecl {
                    ty: inner_ty,
                    name: None,
                    len: 0,
                    symbol: None,
                    span: node.children[3].span,
                });
                Some(Decl::Func(FuncDecl {
                    ret,
                    name,
                    params: vec![inner],
                    decls: Vec::new(),
                    stmts: Vec::new(),
                    scope: None,
                    symbol: None,
                    span: node.span,
                }))
            }
            _ => None,
        }
    }

    fn stmt(&mut self, node: &ParseTree) -> Option<Stmt> {
        let kids = &node.children;
        match kids.len() {
            0 => None,
            // RETURN Expr
            2 if kids[0].symbol == "RETURN" => {
                let value = self.expr(&kids[1]);
                Some(Stmt::Return {
                    value,
                    span: node.span,
                })
            }
            // ID ASG Expr
            3 if kids[1].symbol == "ASG" => {
                let target = self.id_expr(&kids[0]);
                let value = self.expr(&kids[2])?;
                Some(Stmt::Assign {
                    target,
                    value,
                    span: node.span,
                })
            }
            // LBR Stmts RBR
            3 if kids[0].symbol == "LBR" => {
                let body = self.stmt_list(&kids[1]);
                Some(Stmt::Block {
                    body,
                    span: node.span,
                })
            }
            // ID LPA Args RPA: a call evaluated for effect
            4 if kids[1].symbol == "LPA" => {
                let args = self.arg_list(&kids[2]);
                let call = Expr::new(
                    ExprKind::Call {
                        callee: kids[0].text().to_string(),
                        args,
                        symbol: None,
                    },
                    node.span,
                );
                Some(Stmt::ExprEval {
                    expr: call,
                    span: node.span,
                })
            }
            // IF LPA Cond RPA Stmt / WHILE LPA Cond RPA Stmt
            5 if kids[0].symbol == "IF" => {
                let cond = self.expr(&kids[2])?;
                let then_stmt = Box::new(self.stmt(&kids[4])?);
                Some(Stmt::If {
                    cond,
                    then_stmt,
                    else_stmt: None,
                    span: node.span,
                })
            }
            5 if kids[0].symbol == "WHILE" => {
                let cond = self.expr(&kids[2])?;
                let body = Box::new(self.stmt(&kids[4])?);
                Some(Stmt::While {
                    cond,
                    body,
                    span: node.span,
                })
            }
            // ID LBK Expr RBK ASG Expr
            6 if kids[1].symbol == "LBK" => {
                let array = self.id_expr(&kids[0]);
                let index = self.expr(&kids[2])?;
                let target = Expr::new(
                    ExprKind::Index {
                        array: Box::new(array),
                        index: Some(Box::new(index)),
                    },
                    kids[0].span.to(kids[3].span),
                );
                let value = self.expr(&kids[5])?;
                Some(Stmt::Assign {
                    target,
                    value,
                    span: node.span,
                })
            }
            // IF LPA Cond RPA Stmt ELSE Stmt
            7 if kids[0].symbol == "IF" => {
                let cond = self.expr(&kids[2])?;
                let then_stmt = Box::new(self.stmt(&kids[4])?);
                let else_stmt = Some(Box::new(self.stmt(&kids[6])?));
                Some(Stmt::If {
                    cond,
                    then_stmt,
                    else_stmt,
                    span: node.span,
                })
            }
            _ => None,
        }
    }

    fn expr(&mut self, node: &ParseTree) -> Option<Expr> {
        if node.symbol == "Cond" {
            return self.cond(node);
        }
        let kids = &node.children;
        match kids.len() {
            1 => match kids[0].symbol.as_str() {
                "NUM" => Some(Expr::new(
                    ExprKind::Int(self.int_lexeme(&kids[0])),
                    node.span,
                )),
                "FLO" => Some(Expr::new(
                    ExprKind::Float(self.float_lexeme(&kids[0])),
                    node.span,
                )),
                "ID" => Some(self.id_expr(&kids[0])),
                _ => self.expr(&kids[0]),
            },
            3 if kids[0].symbol == "LPA" => self.expr(&kids[1]),
            3 if kids[1].symbol == "ADD" || kids[1].symbol == "MUL" => {
                let op = if kids[1].symbol == "ADD" {
                    BinOp::Add
                } else {
                    BinOp::Mul
                };
                let left = self.expr(&kids[0])?;
                let right = self.expr(&kids[2])?;
                Some(Expr::new(
                    ExprKind::Binary {
                        op,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                    node.span,
                ))
            }
            4 if kids[1].symbol == "LBK" => {
                let array = self.id_expr(&kids[0]);
                let index = self.expr(&kids[2])?;
                Some(Expr::new(
                    ExprKind::Index {
                        array: Box::new(array),
                        index: Some(Box::new(index)),
                    },
                    node.span,
                ))
            }
            4 if kids[1].symbol == "LPA" => {
                let args = self.arg_list(&kids[2]);
                Some(Expr::new(
                    ExprKind::Call {
                        callee: kids[0].text().to_string(),
                        args,
                        symbol: None,
                    },
                    node.span,
                ))
            }
            _ => None,
        }
    }

    /// `Cond -> Expr | Expr ROP Expr`
    fn cond(&mut self, node: &ParseTree) -> Option<Expr> {
        let kids = &node.children;
        match kids.len() {
            1 => self.expr(&kids[0]),
            3 => {
                let op = match kids[1].text() {
                    "<" => BinOp::Lt,
                    ">" => BinOp::Gt,
                    "!=" => BinOp::Ne,
                    "<=" => BinOp::Le,
                    ">=" => BinOp::Ge,
                    _ => BinOp::Eq,
                };
                let left = self.expr(&kids[0])?;
                let right = self.expr(&kids[2])?;
                Some(Expr::new(
                    ExprKind::Binary {
                        op,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                    node.span,
                ))
            }
            _ => None,
        }
    }

    /// `Arg -> Expr | ID LBK RBK | ID LBR RBR`
    fn arg(&mut self, node: &ParseTree) -> Option<Expr> {
        let kids = &node.children;
        match kids.len() {
            1 => self.expr(&kids[0]),
            // ID LBK RBK: a whole array
            3 if kids[1].symbol == "LBK" => {
                let array = self.id_expr(&kids[0]);
                Some(Expr::new(
                    ExprKind::Index {
                        array: Box::new(array),
                        index: None,
                    },
                    node.span,
                ))
            }
            // ID LBR RBR: a function passed by name
            3 if kids[1].symbol == "LBR" => Some(self.id_expr(&kids[0])),
            _ => None,
        }
    }

    fn id_expr(&mut self, node: &ParseTree) -> Expr {
        Expr::new(
            ExprKind::Id {
                name: node.text().to_string(),
                symbol: None,
            },
            node.span,
        )
    }

    fn int_lexeme(&mut self, node: &ParseTree) -> i32 {
        match node.text().parse() {
            Ok(v) => v,
            Err(_) => {
                self.err(node, format!("integer literal out of range: {}", node.text()));
                0
            }
        }
    }

    fn float_lexeme(&mut self, node: &ParseTree) -> f32 {
        match node.text().parse() {
            Ok(v) => v,
            Err(_) => {
                self.err(node, format!("invalid float literal: {}", node.text()));
                0.0
            }
        }
    }
}
