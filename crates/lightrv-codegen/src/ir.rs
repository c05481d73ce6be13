//! The three-address intermediate representation.
//!
//! Memory is explicit: every local begins with an `alloc`, reads go through
//! `load` and writes through `store`; array elements are addressed with
//! `getelptr`. Control flow is labelled basic blocks ending in a branch,
//! jump or return.
//!
//! Symbols live in one program-wide arena addressed by [`IrId`]; instructions
//! reference symbols by id, and storage assignment mutates the arena entry.
//! Name prefixes: `%` for locals and temporaries, `@` for globals and
//! functions, `.L` for labels.

use std::collections::BTreeSet;
use std::fmt::Write;

use smallvec::SmallVec;

use lightrv_core::ast::BinOp;
use lightrv_core::types::Type;

use crate::riscv::{Reg, RvInstr};

/// Index of a symbol in the program's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IrId(pub u32);

/// Where a symbol lives after register allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    Reg(Reg),
    /// Offset from the frame pointer (negative: locals and spills; positive:
    /// incoming stack arguments).
    Stack(i32),
    /// Globals and function labels, resolved by name.
    Static,
}

impl Storage {
    fn text(&self) -> String {
        match self {
            Storage::Reg(r) => format!("[in {}]", r),
            Storage::Stack(offset) if *offset < 0 => format!("[in fp{}]", offset),
            Storage::Stack(offset) => format!("[in fp+{}]", offset),
            Storage::Static => "[in static area]".to_string(),
        }
    }
}

/// A named IR symbol with its type and (eventually) storage.
#[derive(Debug, Clone)]
pub struct IrSym {
    pub name: String,
    pub ty: Type,
    pub storage: Option<Storage>,
}

/// An operand: a symbol or an immediate constant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IrValue {
    Sym(IrId),
    Int(i32),
    Float(f32),
}

impl IrValue {
    pub fn sym(self) -> Option<IrId> {
        match self {
            IrValue::Sym(id) => Some(id),
            _ => None,
        }
    }
}

/// One IR instruction.
#[derive(Debug, Clone)]
pub enum IrInstr {
    /// Reserve frame space for a value of `ty`; `dst` holds its address.
    Alloc {
        dst: IrId,
        ty: Type,
        /// Offset from the frame pointer, set during allocation.
        position: Option<i32>,
    },
    Load {
        dst: IrId,
        src: IrId,
    },
    Store {
        src: IrValue,
        dst: IrId,
    },
    /// `dst = base + offset * sizeof(element)`; the byte scaling happens at
    /// emission.
    GetElPtr {
        dst: IrId,
        base: IrId,
        offset: IrValue,
    },
    Binary {
        dst: IrId,
        op: BinOp,
        lhs: IrValue,
        rhs: IrValue,
    },
    Br {
        cond: IrValue,
        then_label: IrId,
        else_label: IrId,
    },
    Jump {
        label: IrId,
    },
    I2F {
        dst: IrId,
        src: IrValue,
    },
    F2I {
        dst: IrId,
        src: IrValue,
    },
    Call {
        result: Option<IrId>,
        callee: IrId,
        args: Vec<IrValue>,
        /// Index of the callee in the program's function list for a direct
        /// call; `None` when calling through a function-typed parameter.
        callee_func: Option<usize>,
    },
    Ret {
        value: Option<IrValue>,
    },
}

impl IrInstr {
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            IrInstr::Br { .. } | IrInstr::Jump { .. } | IrInstr::Ret { .. }
        )
    }

    /// Symbols this instruction defines.
    pub fn defs(&self) -> SmallVec<[IrId; 1]> {
        let mut out = SmallVec::new();
        match self {
            IrInstr::Alloc { dst, .. }
            | IrInstr::Load { dst, .. }
            | IrInstr::GetElPtr { dst, .. }
            | IrInstr::Binary { dst, .. }
            | IrInstr::I2F { dst, .. }
            | IrInstr::F2I { dst, .. } => out.push(*dst),
            IrInstr::Call { result, .. } => {
                if let Some(result) = result {
                    out.push(*result);
                }
            }
            _ => {}
        }
        out
    }

    /// Symbols this instruction uses.
    pub fn uses(&self) -> SmallVec<[IrId; 2]> {
        fn push_value(out: &mut SmallVec<[IrId; 2]>, v: &IrValue) {
            if let IrValue::Sym(id) = v {
                out.push(*id);
            }
        }
        let mut out = SmallVec::new();
        match self {
            IrInstr::Alloc { .. } | IrInstr::Jump { .. } => {}
            IrInstr::Load { src, .. } => out.push(*src),
            IrInstr::Store { src, dst } => {
                out.push(*dst);
                push_value(&mut out, src);
            }
            IrInstr::GetElPtr { base, offset, .. } => {
                out.push(*base);
                push_value(&mut out, offset);
            }
            IrInstr::Binary { lhs, rhs, .. } => {
                push_value(&mut out, lhs);
                push_value(&mut out, rhs);
            }
            IrInstr::Br { cond, .. } => push_value(&mut out, cond),
            IrInstr::I2F { src, .. } | IrInstr::F2I { src, .. } => push_value(&mut out, src),
            IrInstr::Call { callee, args, .. } => {
                out.push(*callee);
                for arg in args {
                    push_value(&mut out, arg);
                }
            }
            IrInstr::Ret { value } => {
                if let Some(value) = value {
                    push_value(&mut out, value);
                }
            }
        }
        out
    }
}

/// A labelled straight-line instruction sequence with one terminator.
#[derive(Debug, Clone)]
pub struct BasicBlock {
    pub label: IrId,
    pub instrs: Vec<IrInstr>,
    /// The first terminator pushed; later terminators are dead and dropped.
    pub terminator: Option<IrInstr>,
    /// Lowered machine code, filled by the emitter.
    pub asm: Vec<RvInstr>,
}

impl BasicBlock {
    pub fn new(label: IrId) -> Self {
        BasicBlock {
            label,
            instrs: Vec::new(),
            terminator: None,
            asm: Vec::new(),
        }
    }

    /// Append an instruction; terminators go to the terminator slot, and the
    /// first one to arrive is the block's end.
    pub fn push(&mut self, instr: IrInstr) {
        if instr.is_terminator() {
            if self.terminator.is_none() {
                self.terminator = Some(instr);
            }
        } else {
            self.instrs.push(instr);
        }
    }
}

/// A global variable definition, reserved in `.bss`.
#[derive(Debug, Clone)]
pub struct IrGlobal {
    /// The `@name` symbol; its type is a pointer to the variable type.
    pub sym: IrId,
    /// The variable's own type, which determines the reserved size.
    pub ty: Type,
}

/// A function: parameters, blocks, and the frame data the allocator and
/// emitter fill in.
#[derive(Debug, Clone)]
pub struct IrFunc {
    pub sym: IrId,
    pub params: Vec<IrId>,
    pub blocks: Vec<BasicBlock>,
    /// Frame setup, filled by the emitter.
    pub entry: Vec<RvInstr>,
    pub epilogue_label: IrId,
    /// Frame teardown, filled by the emitter.
    pub epilogue: Vec<RvInstr>,
    /// Negative total frame size, set by the allocator.
    pub frame_size: i32,
    /// Bytes of incoming stack-passed arguments.
    pub param_area: i32,
    /// Indices of directly called functions.
    pub calls: BTreeSet<usize>,
}

/// The whole compilation unit.
#[derive(Debug, Clone)]
pub struct IrProgram {
    pub syms: Vec<IrSym>,
    pub globals: Vec<IrGlobal>,
    pub functions: Vec<IrFunc>,
}

impl IrProgram {
    pub fn sym(&self, id: IrId) -> &IrSym {
        &self.syms[id.0 as usize]
    }

    pub fn sym_mut(&mut self, id: IrId) -> &mut IrSym {
        &mut self.syms[id.0 as usize]
    }

    pub fn storage(&self, id: IrId) -> Option<Storage> {
        self.sym(id).storage
    }

    /// The type of an operand: constants are `int`/`float`, symbols carry
    /// their arena type.
    pub fn value_type(&self, value: &IrValue) -> Type {
        match value {
            IrValue::Sym(id) => self.sym(*id).ty.clone(),
            IrValue::Int(_) => lightrv_core::types::INT,
            IrValue::Float(_) => lightrv_core::types::FLOAT,
        }
    }

    fn value_text(&self, value: &IrValue) -> String {
        match value {
            IrValue::Sym(id) => self.sym_text(*id),
            IrValue::Int(v) => v.to_string(),
            IrValue::Float(v) => format!("{:?}", v),
        }
    }

    fn sym_text(&self, id: IrId) -> String {
        let sym = self.sym(id);
        let storage = sym
            .storage
            .as_ref()
            .map(|s| s.text())
            .unwrap_or_default();
        format!("{}:{}{}", sym.name, sym.ty, storage)
    }

    fn instr_text(&self, instr: &IrInstr) -> String {
        match instr {
            IrInstr::Alloc { dst, ty, position } => {
                let at = position
                    .map(|p| format!(" [allocated in fp{}]", p))
                    .unwrap_or_default();
                format!("{} = alloc {}{}", self.sym_text(*dst), ty, at)
            }
            IrInstr::Load { dst, src } => {
                format!("{} = load {}", self.sym_text(*dst), self.sym_text(*src))
            }
            IrInstr::Store { src, dst } => {
                format!("store {}, {}", self.value_text(src), self.sym_text(*dst))
            }
            IrInstr::GetElPtr { dst, base, offset } => format!(
                "{} = getelptr {}, {}",
                self.sym_text(*dst),
                self.sym_text(*base),
                self.value_text(offset)
            ),
            IrInstr::Binary { dst, op, lhs, rhs } => format!(
                "{} = {} {}, {}",
                self.sym_text(*dst),
                op.mnemonic(),
                self.value_text(lhs),
                self.value_text(rhs)
            ),
            IrInstr::Br {
                cond,
                then_label,
                else_label,
            } => format!(
                "br {}, {}, {}",
                self.value_text(cond),
                self.sym(*then_label).name,
                self.sym(*else_label).name
            ),
            IrInstr::Jump { label } => format!("jump {}", self.sym(*label).name),
            IrInstr::I2F { dst, src } => {
                format!("{} = i2f {}", self.sym_text(*dst), self.value_text(src))
            }
            IrInstr::F2I { dst, src } => {
                format!("{} = f2i {}", self.sym_text(*dst), self.value_text(src))
            }
            IrInstr::Call {
                result,
                callee,
                args,
                ..
            } => {
                let prefix = result
                    .map(|r| format!("{} = ", self.sym_text(r)))
                    .unwrap_or_default();
                let args: Vec<String> = args.iter().map(|a| self.value_text(a)).collect();
                format!(
                    "{}call {}({})",
                    prefix,
                    self.sym(*callee).name,
                    args.join(", ")
                )
            }
            IrInstr::Ret { value } => match value {
                Some(value) => format!("ret {}", self.value_text(value)),
                None => "ret".to_string(),
            },
        }
    }

    /// Textual IR dump. Before allocation symbols print bare; afterwards
    /// each carries its storage annotation, which is what the `.alloc`
    /// sidecar shows.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for global in &self.globals {
            let _ = writeln!(out, "global {};", self.sym_text(global.sym));
        }
        if !self.globals.is_empty() {
            out.push('\n');
        }
        for func in &self.functions {
            let sym = self.sym(func.sym);
            let params: Vec<String> = func.params.iter().map(|p| self.sym_text(*p)).collect();
            let _ = writeln!(out, "fun {}({}) : {} {{", sym.name, params.join(", "), sym.ty);
            for block in &func.blocks {
                let _ = writeln!(out, "{}:", self.sym(block.label).name);
                for instr in &block.instrs {
                    let _ = writeln!(out, "  {}", self.instr_text(instr));
                }
                if let Some(terminator) = &block.terminator {
                    let _ = writeln!(out, "  {}", self.instr_text(terminator));
                }
            }
            let _ = writeln!(out, "}}\n");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lightrv_core::types;
    use lightrv_core::types::Type;

    fn arena() -> (IrProgram, IrId, IrId) {
        let mut prog = IrProgram {
            syms: Vec::new(),
            globals: Vec::new(),
            functions: Vec::new(),
        };
        prog.syms.push(IrSym {
            name: "%x".to_string(),
            ty: Type::pointer(types::INT),
            storage: None,
        });
        prog.syms.push(IrSym {
            name: "%1".to_string(),
            ty: types::INT,
            storage: None,
        });
        (prog, IrId(0), IrId(1))
    }

    #[test]
    fn first_terminator_is_the_block_end() {
        let (_, x, _) = arena();
        let mut block = BasicBlock::new(x);
        block.push(IrInstr::Ret { value: None });
        block.push(IrInstr::Jump { label: x });
        assert!(matches!(block.terminator, Some(IrInstr::Ret { .. })));
        assert!(block.instrs.is_empty());
    }

    #[test]
    fn defs_and_uses_of_load_and_store() {
        let (_, x, t) = arena();
        let load = IrInstr::Load { dst: t, src: x };
        assert_eq!(load.defs().as_slice(), &[t]);
        assert_eq!(load.uses().as_slice(), &[x]);

        let store = IrInstr::Store {
            src: IrValue::Sym(t),
            dst: x,
        };
        assert!(store.defs().is_empty());
        assert_eq!(store.uses().as_slice(), &[x, t]);
    }

    #[test]
    fn constants_are_not_uses() {
        let (_, x, t) = arena();
        let binary = IrInstr::Binary {
            dst: t,
            op: BinOp::Add,
            lhs: IrValue::Int(1),
            rhs: IrValue::Sym(x),
        };
        assert_eq!(binary.uses().as_slice(), &[x]);
    }

    #[test]
    fn storage_annotations_render() {
        let (mut prog, x, _) = arena();
        assert_eq!(prog.sym_text(x), "%x:int*");
        prog.sym_mut(x).storage = Some(Storage::Stack(-12));
        assert_eq!(prog.sym_text(x), "%x:int*[in fp-12]");
        prog.sym_mut(x).storage = Some(Storage::Static);
        assert_eq!(prog.sym_text(x), "%x:int*[in static area]");
    }

    #[test]
    fn value_types() {
        let (prog, x, _) = arena();
        assert_eq!(prog.value_type(&IrValue::Int(3)), types::INT);
        assert_eq!(prog.value_type(&IrValue::Float(1.0)), types::FLOAT);
        assert_eq!(prog.value_type(&IrValue::Sym(x)), Type::pointer(types::INT));
    }
}
