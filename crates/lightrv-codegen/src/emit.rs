//! IR to RV32 assembly emission.
//!
//! Every function gets a frame prologue/epilogue around its blocks; every IR
//! opcode dispatches on the storage class of its operands. Operand
//! materialisation goes through `read_int`/`read_float`: constants load into
//! the caller-chosen default register, register-resident symbols are used in
//! place, stack-resident symbols reload from the frame, and static symbols
//! materialise their address with `la`.
//!
//! Calls follow the hard-float ILP32 convention: the first eight integer
//! arguments in `a0..a7`, the first eight float arguments in `fa0..fa7`,
//! overflow in 4-byte slots above the stack pointer, results in `a0`/`fa0`.

use lightrv_core::ast::BinOp;

use crate::ir::{IrInstr, IrProgram, IrValue, Storage};
use crate::riscv::{FBinOp, FCmpOp, FloatReg, ImmOp, IntReg, Reg, RegOp, RvInstr};

/// Strip the `@` sigil off a symbol name for use as an assembly label.
fn asm_label(name: &str) -> String {
    name.strip_prefix('@').unwrap_or(name).to_string()
}

/// Bit pattern of a single-precision constant, for `li`.
fn float_bits(v: f32) -> i32 {
    v.to_bits() as i32
}

/// Lower every function's blocks to machine code and attach the frame
/// prologue and epilogue. Run after storage allocation.
pub fn emit(prog: &mut IrProgram) {
    for f in 0..prog.functions.len() {
        let frame = prog.functions[f].frame_size;

        let entry = vec![
            RvInstr::imm(ImmOp::Addi, IntReg::Sp, IntReg::Sp, frame),
            RvInstr::sw(IntReg::Ra, IntReg::Sp, -frame - 4),
            RvInstr::sw(IntReg::Fp, IntReg::Sp, -frame - 8),
            RvInstr::imm(ImmOp::Addi, IntReg::Fp, IntReg::Sp, -frame),
        ];
        let epilogue = vec![
            RvInstr::lw(IntReg::Fp, IntReg::Sp, -frame - 8),
            RvInstr::lw(IntReg::Ra, IntReg::Sp, -frame - 4),
            RvInstr::imm(ImmOp::Addi, IntReg::Sp, IntReg::Sp, -frame),
            RvInstr::Ret,
        ];

        for b in 0..prog.functions[f].blocks.len() {
            let mut out = Vec::new();
            let block = &prog.functions[f].blocks[b];
            for instr in &block.instrs {
                emit_instr(prog, f, instr, &mut out);
            }
            if let Some(terminator) = &block.terminator {
                emit_instr(prog, f, terminator, &mut out);
            }
            prog.functions[f].blocks[b].asm = out;
        }

        prog.functions[f].entry = entry;
        prog.functions[f].epilogue = epilogue;
    }
}

/// Materialise `val` as an integer register, using `dfl` when a load or
/// constant is needed.
fn read_int(prog: &IrProgram, out: &mut Vec<RvInstr>, val: &IrValue, dfl: IntReg) -> IntReg {
    match val {
        IrValue::Int(v) => {
            out.push(RvInstr::Li { rd: dfl, imm: *v });
            dfl
        }
        IrValue::Float(v) => {
            out.push(RvInstr::Li {
                rd: dfl,
                imm: float_bits(*v),
            });
            dfl
        }
        IrValue::Sym(id) => match prog.storage(*id) {
            Some(Storage::Reg(Reg::Int(r))) => r,
            Some(Storage::Stack(offset)) => {
                out.push(RvInstr::lw(dfl, IntReg::Fp, offset));
                dfl
            }
            Some(Storage::Static) => {
                out.push(RvInstr::La {
                    rd: dfl,
                    label: asm_label(&prog.sym(*id).name),
                });
                dfl
            }
            _ => dfl,
        },
    }
}

/// Materialise `val` as a float register; `tmp` stages constant bit
/// patterns and static addresses.
fn read_float(
    prog: &IrProgram,
    out: &mut Vec<RvInstr>,
    val: &IrValue,
    dfl: FloatReg,
    tmp: IntReg,
) -> FloatReg {
    match val {
        IrValue::Float(v) => {
            out.push(RvInstr::Li {
                rd: tmp,
                imm: float_bits(*v),
            });
            out.push(RvInstr::FmvWX { rd: dfl, rs: tmp });
            dfl
        }
        IrValue::Int(v) => {
            out.push(RvInstr::Li { rd: tmp, imm: *v });
            out.push(RvInstr::FmvWX { rd: dfl, rs: tmp });
            dfl
        }
        IrValue::Sym(id) => match prog.storage(*id) {
            Some(Storage::Reg(Reg::Float(r))) => r,
            Some(Storage::Stack(offset)) => {
                out.push(RvInstr::flw(dfl, IntReg::Fp, offset));
                dfl
            }
            Some(Storage::Static) => {
                out.push(RvInstr::La {
                    rd: tmp,
                    label: asm_label(&prog.sym(*id).name),
                });
                out.push(RvInstr::flw(dfl, tmp, 0));
                dfl
            }
            _ => dfl,
        },
    }
}

fn emit_instr(prog: &IrProgram, func: usize, instr: &IrInstr, out: &mut Vec<RvInstr>) {
    match instr {
        IrInstr::Alloc { dst, position, .. } => {
            debug_assert!(position.is_some(), "alloc without a frame position");
            let pos = position.unwrap_or_default();
            match prog.storage(*dst) {
                Some(Storage::Reg(Reg::Int(r))) => {
                    out.push(RvInstr::imm(ImmOp::Addi, r, IntReg::Fp, pos));
                }
                Some(Storage::Stack(offset)) => {
                    out.push(RvInstr::imm(ImmOp::Addi, IntReg::T6, IntReg::Fp, pos));
                    out.push(RvInstr::sw(IntReg::T6, IntReg::Fp, offset));
                }
                _ => {}
            }
        }

        IrInstr::Load { dst, src } => {
            let ptr = read_int(prog, out, &IrValue::Sym(*src), IntReg::A0);
            match prog.storage(*dst) {
                Some(Storage::Reg(Reg::Int(r))) => out.push(RvInstr::lw(r, ptr, 0)),
                Some(Storage::Reg(Reg::Float(r))) => out.push(RvInstr::flw(r, ptr, 0)),
                Some(Storage::Stack(offset)) => {
                    out.push(RvInstr::lw(IntReg::T6, ptr, 0));
                    out.push(RvInstr::sw(IntReg::T6, IntReg::Fp, offset));
                }
                _ => {}
            }
        }

        IrInstr::Store { src, dst } => emit_store(prog, src, *dst, out),

        IrInstr::GetElPtr { dst, base, offset } => {
            let off = read_int(prog, out, offset, IntReg::T6);
            // Scale the element index to a byte offset.
            out.push(RvInstr::imm(ImmOp::Slli, IntReg::T6, off, 2));
            let base_reg = read_int(prog, out, &IrValue::Sym(*base), IntReg::A0);
            match prog.storage(*dst) {
                Some(Storage::Reg(Reg::Int(r))) => out.push(RvInstr::Reg {
                    op: RegOp::Add,
                    rd: r,
                    rs1: base_reg,
                    rs2: IntReg::T6,
                }),
                Some(Storage::Stack(at)) => {
                    out.push(RvInstr::Reg {
                        op: RegOp::Add,
                        rd: IntReg::A0,
                        rs1: base_reg,
                        rs2: IntReg::T6,
                    });
                    out.push(RvInstr::sw(IntReg::A0, IntReg::Fp, at));
                }
                _ => {}
            }
        }

        IrInstr::Binary { dst, op, lhs, rhs } => {
            if prog.value_type(lhs).is_float() {
                emit_float_binary(prog, *dst, *op, lhs, rhs, out);
            } else {
                emit_int_binary(prog, *dst, *op, lhs, rhs, out);
            }
        }

        IrInstr::Br {
            cond,
            then_label,
            else_label,
        } => {
            let reg = read_int(prog, out, cond, IntReg::T6);
            out.push(RvInstr::Bnez {
                rs: reg,
                label: prog.sym(*then_label).name.clone(),
            });
            out.push(RvInstr::Beqz {
                rs: reg,
                label: prog.sym(*else_label).name.clone(),
            });
        }

        IrInstr::Jump { label } => out.push(RvInstr::J {
            label: prog.sym(*label).name.clone(),
        }),

        IrInstr::I2F { dst, src } => {
            let s = read_int(prog, out, src, IntReg::T6);
            match prog.storage(*dst) {
                Some(Storage::Reg(Reg::Float(r))) => out.push(RvInstr::FcvtSW { rd: r, rs: s }),
                Some(Storage::Stack(offset)) => {
                    out.push(RvInstr::FcvtSW {
                        rd: FloatReg::Fa0,
                        rs: s,
                    });
                    out.push(RvInstr::fsw(FloatReg::Fa0, IntReg::Fp, offset));
                }
                _ => {}
            }
        }

        IrInstr::F2I { dst, src } => {
            let s = read_float(prog, out, src, FloatReg::Fa0, IntReg::T6);
            match prog.storage(*dst) {
                Some(Storage::Reg(Reg::Int(r))) => out.push(RvInstr::FcvtWS { rd: r, rs: s }),
                Some(Storage::Stack(offset)) => {
                    out.push(RvInstr::FcvtWS {
                        rd: IntReg::A0,
                        rs: s,
                    });
                    out.push(RvInstr::sw(IntReg::A0, IntReg::Fp, offset));
                }
                _ => {}
            }
        }

        IrInstr::Call {
            result,
            callee,
            args,
            callee_func,
        } => emit_call(prog, func, *result, *callee, args, *callee_func, out),

        IrInstr::Ret { value } => {
            match value {
                None => out.push(RvInstr::Mv {
                    rd: IntReg::A0,
                    rs: IntReg::Zero,
                }),
                Some(v) => {
                    if prog.value_type(v).is_float() {
                        let r = read_float(prog, out, v, FloatReg::Fa0, IntReg::T6);
                        out.push(RvInstr::FmvS {
                            rd: FloatReg::Fa0,
                            rs: r,
                        });
                    } else {
                        let r = read_int(prog, out, v, IntReg::A0);
                        out.push(RvInstr::Mv {
                            rd: IntReg::A0,
                            rs: r,
                        });
                    }
                }
            }
            out.push(RvInstr::J {
                label: prog
                    .sym(prog.functions[func].epilogue_label)
                    .name
                    .clone(),
            });
        }
    }
}

/// Store through the destination's pointer; static destinations use the
/// global-store pseudo-instructions.
fn emit_store(prog: &IrProgram, src: &IrValue, dst: crate::ir::IrId, out: &mut Vec<RvInstr>) {
    if prog.storage(dst) == Some(Storage::Static) {
        let label = asm_label(&prog.sym(dst).name);
        match src {
            IrValue::Int(v) => {
                out.push(RvInstr::Li {
                    rd: IntReg::T6,
                    imm: *v,
                });
                out.push(RvInstr::SwGlobal {
                    rs: IntReg::T6,
                    label,
                    tmp: IntReg::A0,
                });
            }
            IrValue::Float(v) => {
                out.push(RvInstr::Li {
                    rd: IntReg::T6,
                    imm: float_bits(*v),
                });
                out.push(RvInstr::SwGlobal {
                    rs: IntReg::T6,
                    label,
                    tmp: IntReg::A0,
                });
            }
            IrValue::Sym(id) => match prog.storage(*id) {
                Some(Storage::Reg(Reg::Int(r))) => out.push(RvInstr::SwGlobal {
                    rs: r,
                    label,
                    tmp: IntReg::A0,
                }),
                Some(Storage::Reg(Reg::Float(r))) => out.push(RvInstr::FswGlobal {
                    rs: r,
                    label,
                    tmp: IntReg::A0,
                }),
                Some(Storage::Stack(offset)) => {
                    out.push(RvInstr::lw(IntReg::T6, IntReg::Fp, offset));
                    out.push(RvInstr::SwGlobal {
                        rs: IntReg::T6,
                        label,
                        tmp: IntReg::A0,
                    });
                }
                _ => {}
            },
        }
        return;
    }

    let ptr = read_int(prog, out, &IrValue::Sym(dst), IntReg::A0);
    match src {
        IrValue::Int(v) => {
            out.push(RvInstr::Li {
                rd: IntReg::T6,
                imm: *v,
            });
            out.push(RvInstr::sw(IntReg::T6, ptr, 0));
        }
        IrValue::Float(v) => {
            out.push(RvInstr::Li {
                rd: IntReg::T6,
                imm: float_bits(*v),
            });
            out.push(RvInstr::sw(IntReg::T6, ptr, 0));
        }
        IrValue::Sym(id) => match prog.storage(*id) {
            Some(Storage::Reg(Reg::Int(r))) => out.push(RvInstr::sw(r, ptr, 0)),
            Some(Storage::Reg(Reg::Float(r))) => out.push(RvInstr::fsw(r, ptr, 0)),
            Some(Storage::Stack(offset)) => {
                if prog.sym(*id).ty.is_float() {
                    out.push(RvInstr::flw(FloatReg::Ft11, IntReg::Fp, offset));
                    out.push(RvInstr::fsw(FloatReg::Ft11, ptr, 0));
                } else {
                    out.push(RvInstr::lw(IntReg::T6, IntReg::Fp, offset));
                    out.push(RvInstr::sw(IntReg::T6, ptr, 0));
                }
            }
            _ => {}
        },
    }
}

fn emit_int_binary(
    prog: &IrProgram,
    dst: crate::ir::IrId,
    op: BinOp,
    lhs: &IrValue,
    rhs: &IrValue,
    out: &mut Vec<RvInstr>,
) {
    let l = read_int(prog, out, lhs, IntReg::A0);
    let r = read_int(prog, out, rhs, IntReg::A1);
    let dst_storage = prog.storage(dst);

    // Greater-than forms are the swapped less-than forms.
    let (l, r, op) = match op {
        BinOp::Gt => (r, l, BinOp::Lt),
        BinOp::Ge => (r, l, BinOp::Le),
        _ => (l, r, op),
    };

    // Compute into `rd`, with `stage` as the register the result passes
    // through when the destination lives on the stack.
    let (rd, spill_to) = match dst_storage {
        Some(Storage::Reg(Reg::Int(reg))) => (reg, None),
        Some(Storage::Stack(offset)) => {
            let stage = if matches!(op, BinOp::Le) {
                IntReg::T6
            } else {
                IntReg::A0
            };
            (stage, Some(offset))
        }
        _ => return,
    };

    match op {
        BinOp::Add => out.push(RvInstr::Reg {
            op: RegOp::Add,
            rd,
            rs1: l,
            rs2: r,
        }),
        BinOp::Mul => out.push(RvInstr::Reg {
            op: RegOp::Mul,
            rd,
            rs1: l,
            rs2: r,
        }),
        BinOp::Lt => out.push(RvInstr::Reg {
            op: RegOp::Slt,
            rd,
            rs1: l,
            rs2: r,
        }),
        BinOp::Le => {
            // rd = (l < r) | (l == r)
            out.push(RvInstr::Reg {
                op: RegOp::Slt,
                rd,
                rs1: l,
                rs2: r,
            });
            out.push(RvInstr::Reg {
                op: RegOp::Xor,
                rd: IntReg::A0,
                rs1: l,
                rs2: r,
            });
            out.push(RvInstr::Seqz {
                rd: IntReg::A0,
                rs: IntReg::A0,
            });
            out.push(RvInstr::Reg {
                op: RegOp::Or,
                rd,
                rs1: rd,
                rs2: IntReg::A0,
            });
        }
        BinOp::Eq => {
            out.push(RvInstr::Reg {
                op: RegOp::Xor,
                rd,
                rs1: l,
                rs2: r,
            });
            out.push(RvInstr::Seqz { rd, rs: rd });
        }
        BinOp::Ne => {
            out.push(RvInstr::Reg {
                op: RegOp::Xor,
                rd,
                rs1: l,
                rs2: r,
            });
            out.push(RvInstr::Snez { rd, rs: rd });
        }
        BinOp::Gt | BinOp::Ge => unreachable!("normalised above"),
    }

    if let Some(offset) = spill_to {
        out.push(RvInstr::sw(rd, IntReg::Fp, offset));
    }
}

fn emit_float_binary(
    prog: &IrProgram,
    dst: crate::ir::IrId,
    op: BinOp,
    lhs: &IrValue,
    rhs: &IrValue,
    out: &mut Vec<RvInstr>,
) {
    let l = read_float(prog, out, lhs, FloatReg::Fa0, IntReg::T6);
    let r = read_float(prog, out, rhs, FloatReg::Fa1, IntReg::T6);
    let dst_storage = prog.storage(dst);

    let (l, r, op) = match op {
        BinOp::Gt => (r, l, BinOp::Lt),
        BinOp::Ge => (r, l, BinOp::Le),
        _ => (l, r, op),
    };

    match op {
        BinOp::Add | BinOp::Mul => {
            let fop = if op == BinOp::Add {
                FBinOp::Fadd
            } else {
                FBinOp::Fmul
            };
            match dst_storage {
                Some(Storage::Reg(Reg::Float(rd))) => out.push(RvInstr::FBin {
                    op: fop,
                    rd,
                    rs1: l,
                    rs2: r,
                }),
                Some(Storage::Stack(offset)) => {
                    out.push(RvInstr::FBin {
                        op: fop,
                        rd: FloatReg::Fa0,
                        rs1: l,
                        rs2: r,
                    });
                    out.push(RvInstr::fsw(FloatReg::Fa0, IntReg::Fp, offset));
                }
                _ => {}
            }
        }
        BinOp::Lt | BinOp::Le | BinOp::Eq => {
            let fop = match op {
                BinOp::Lt => FCmpOp::Flt,
                BinOp::Le => FCmpOp::Fle,
                _ => FCmpOp::Feq,
            };
            match dst_storage {
                Some(Storage::Reg(Reg::Int(rd))) => out.push(RvInstr::FCmp {
                    op: fop,
                    rd,
                    rs1: l,
                    rs2: r,
                }),
                Some(Storage::Stack(offset)) => {
                    out.push(RvInstr::FCmp {
                        op: fop,
                        rd: IntReg::A0,
                        rs1: l,
                        rs2: r,
                    });
                    out.push(RvInstr::sw(IntReg::A0, IntReg::Fp, offset));
                }
                _ => {}
            }
        }
        BinOp::Ne => {
            // Not-equal: feq, then flip.
            match dst_storage {
                Some(Storage::Reg(Reg::Int(rd))) => {
                    out.push(RvInstr::FCmp {
                        op: FCmpOp::Feq,
                        rd,
                        rs1: l,
                        rs2: r,
                    });
                    out.push(RvInstr::Seqz { rd, rs: rd });
                }
                Some(Storage::Stack(offset)) => {
                    out.push(RvInstr::FCmp {
                        op: FCmpOp::Feq,
                        rd: IntReg::A0,
                        rs1: l,
                        rs2: r,
                    });
                    out.push(RvInstr::Seqz {
                        rd: IntReg::A0,
                        rs: IntReg::A0,
                    });
                    out.push(RvInstr::sw(IntReg::A0, IntReg::Fp, offset));
                }
                _ => {}
            }
        }
        BinOp::Gt | BinOp::Ge => unreachable!("normalised above"),
    }
}

fn emit_call(
    prog: &IrProgram,
    _func: usize,
    result: Option<crate::ir::IrId>,
    callee: crate::ir::IrId,
    args: &[IrValue],
    callee_func: Option<usize>,
    out: &mut Vec<RvInstr>,
) {
    match callee_func {
        Some(target) => {
            // Known function: its parameter storages say where each
            // argument goes.
            let params = prog.functions[target].params.clone();
            for (arg, param) in args.iter().zip(params) {
                match prog.storage(param) {
                    Some(Storage::Reg(Reg::Float(pr))) => {
                        let val = read_float(prog, out, arg, FloatReg::Ft11, IntReg::T6);
                        out.push(RvInstr::FmvS { rd: pr, rs: val });
                    }
                    Some(Storage::Reg(Reg::Int(pr))) => {
                        let val = read_int(prog, out, arg, IntReg::T6);
                        out.push(RvInstr::Mv { rd: pr, rs: val });
                    }
                    Some(Storage::Stack(offset)) => {
                        if prog.value_type(arg).is_float() {
                            let val = read_float(prog, out, arg, FloatReg::Ft11, IntReg::T6);
                            out.push(RvInstr::fsw(val, IntReg::Sp, offset));
                        } else {
                            let val = read_int(prog, out, arg, IntReg::T6);
                            out.push(RvInstr::sw(val, IntReg::Sp, offset));
                        }
                    }
                    _ => {}
                }
            }
            out.push(RvInstr::Jal {
                rd: IntReg::Ra,
                label: asm_label(&prog.sym(callee).name),
            });
        }
        None => {
            // Function-typed parameter: place arguments by the convention,
            // then jump through the loaded address.
            let mut int_count = 0usize;
            let mut float_count = 0usize;
            let mut stack_count = 0i32;
            for arg in args {
                if prog.value_type(arg).is_float() {
                    let val = read_float(prog, out, arg, FloatReg::Ft11, IntReg::T6);
                    match FloatReg::fa(float_count) {
                        Some(pr) => {
                            float_count += 1;
                            out.push(RvInstr::FmvS { rd: pr, rs: val });
                        }
                        None => {
                            out.push(RvInstr::fsw(val, IntReg::Sp, 4 * stack_count));
                            stack_count += 1;
                        }
                    }
                } else {
                    let val = read_int(prog, out, arg, IntReg::T6);
                    match IntReg::a(int_count) {
                        Some(pr) => {
                            int_count += 1;
                            out.push(RvInstr::Mv { rd: pr, rs: val });
                        }
                        None => {
                            out.push(RvInstr::sw(val, IntReg::Sp, 4 * stack_count));
                            stack_count += 1;
                        }
                    }
                }
            }
            let addr = read_int(prog, out, &IrValue::Sym(callee), IntReg::T6);
            out.push(RvInstr::jalr(IntReg::Ra, addr, 0));
        }
    }

    // Fetch the result out of a0/fa0.
    if let Some(result) = result {
        match prog.storage(result) {
            Some(Storage::Reg(Reg::Float(r))) => out.push(RvInstr::FmvS {
                rd: r,
                rs: FloatReg::Fa0,
            }),
            Some(Storage::Reg(Reg::Int(r))) => out.push(RvInstr::Mv {
                rd: r,
                rs: IntReg::A0,
            }),
            Some(Storage::Stack(offset)) => {
                if prog.sym(result).ty.is_float() {
                    out.push(RvInstr::fsw(FloatReg::Fa0, IntReg::Fp, offset));
                } else {
                    out.push(RvInstr::sw(IntReg::A0, IntReg::Fp, offset));
                }
            }
            _ => {}
        }
    }
}

/// Render the whole program as assembly text: `.bss` objects first, then
/// each function in `.text`.
pub fn render(prog: &IrProgram) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    for global in &prog.globals {
        let name = asm_label(&prog.sym(global.sym).name);
        let size = global.ty.size_in_bytes();
        let _ = writeln!(out, "  .bss");
        let _ = writeln!(out, "  .align 2");
        let _ = writeln!(out, "  .type {}, @object", name);
        let _ = writeln!(out, "  .size {}, {}", name, size);
        let _ = writeln!(out, "{}:", name);
        let _ = writeln!(out, "  .zero {}", size);
        out.push('\n');
    }

    for func in &prog.functions {
        let name = asm_label(&prog.sym(func.sym).name);
        let _ = writeln!(out, "  .align 1");
        let _ = writeln!(out, "  .globl {}", name);
        let _ = writeln!(out, "  .text");
        let _ = writeln!(out, "  .type {}, @function", name);
        let _ = writeln!(out, "{}:", name);
        for instr in &func.entry {
            let _ = writeln!(out, "  {}", instr);
        }
        for block in &func.blocks {
            let _ = writeln!(out, "{}:", prog.sym(block.label).name);
            for instr in &block.asm {
                let _ = writeln!(out, "  {}", instr);
            }
        }
        let _ = writeln!(out, "{}:", prog.sym(func.epilogue_label).name);
        for instr in &func.epilogue {
            let _ = writeln!(out, "  {}", instr);
        }
        let _ = writeln!(out, "  .size {}, .-{}", name, name);
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BasicBlock, IrFunc, IrGlobal, IrId, IrSym};
    use lightrv_core::types::{self, BaseType, Type};
    use std::collections::BTreeSet;

    struct Fixture {
        prog: IrProgram,
    }

    impl Fixture {
        fn new() -> Self {
            Fixture {
                prog: IrProgram {
                    syms: Vec::new(),
                    globals: Vec::new(),
                    functions: Vec::new(),
                },
            }
        }

        fn sym(&mut self, name: &str, ty: Type, storage: Option<Storage>) -> IrId {
            let id = IrId(self.prog.syms.len() as u32);
            self.prog.syms.push(IrSym {
                name: name.to_string(),
                ty,
                storage,
            });
            id
        }

        fn func(&mut self, name: &str, blocks: Vec<BasicBlock>) -> usize {
            let sym = self.sym(
                name,
                Type::Func {
                    ret: BaseType::Void,
                    params: Vec::new(),
                },
                Some(Storage::Static),
            );
            let epilogue_label = self.sym(".Lret", types::LABEL, None);
            self.prog.functions.push(IrFunc {
                sym,
                params: Vec::new(),
                blocks,
                entry: Vec::new(),
                epilogue_label,
                epilogue: Vec::new(),
                frame_size: -8,
                param_area: 0,
                calls: BTreeSet::new(),
            });
            self.prog.functions.len() - 1
        }

        fn asm(&self) -> String {
            render(&self.prog)
        }
    }

    fn treg(i: usize) -> Storage {
        Storage::Reg(Reg::Int(IntReg::t(i).unwrap()))
    }

    #[test]
    fn frame_setup_and_teardown() {
        let mut fx = Fixture::new();
        let label = fx.sym(".L1", types::LABEL, None);
        let mut entry = BasicBlock::new(label);
        entry.push(IrInstr::Ret { value: None });
        fx.func("@f", vec![entry]);
        emit(&mut fx.prog);

        let asm = fx.asm();
        assert!(asm.contains("addi sp, sp, -8"));
        assert!(asm.contains("sw ra, 4(sp)"));
        assert!(asm.contains("sw fp, 0(sp)"));
        assert!(asm.contains("addi fp, sp, 8"));
        // Epilogue restores in reverse and returns.
        assert!(asm.contains("lw fp, 0(sp)"));
        assert!(asm.contains("lw ra, 4(sp)"));
        assert!(asm.contains("addi sp, sp, 8"));
        assert!(asm.contains("\n  ret\n"));
    }

    #[test]
    fn return_jumps_to_epilogue() {
        let mut fx = Fixture::new();
        let label = fx.sym(".L1", types::LABEL, None);
        let mut entry = BasicBlock::new(label);
        entry.push(IrInstr::Ret {
            value: Some(IrValue::Int(3)),
        });
        fx.func("@f", vec![entry]);
        emit(&mut fx.prog);
        let asm = fx.asm();
        assert!(asm.contains("li a0, 3"));
        assert!(asm.contains("mv a0, a0"));
        assert!(asm.contains("j .Lret"));
    }

    #[test]
    fn alloc_in_register_is_address_arithmetic() {
        let mut fx = Fixture::new();
        let label = fx.sym(".L1", types::LABEL, None);
        let x = fx.sym("%x", Type::pointer(types::INT), Some(treg(0)));
        let mut entry = BasicBlock::new(label);
        entry.push(IrInstr::Alloc {
            dst: x,
            ty: types::INT,
            position: Some(-12),
        });
        entry.push(IrInstr::Ret { value: None });
        fx.func("@f", vec![entry]);
        emit(&mut fx.prog);
        assert!(fx.asm().contains("addi t0, fp, -12"));
    }

    #[test]
    fn load_and_store_through_register_pointer() {
        let mut fx = Fixture::new();
        let label = fx.sym(".L1", types::LABEL, None);
        let ptr = fx.sym("%x", Type::pointer(types::INT), Some(treg(0)));
        let val = fx.sym("%1", types::INT, Some(treg(1)));
        let mut entry = BasicBlock::new(label);
        entry.push(IrInstr::Load { dst: val, src: ptr });
        entry.push(IrInstr::Store {
            src: IrValue::Sym(val),
            dst: ptr,
        });
        entry.push(IrInstr::Ret { value: None });
        fx.func("@f", vec![entry]);
        emit(&mut fx.prog);
        let asm = fx.asm();
        assert!(asm.contains("lw t1, 0(t0)"));
        assert!(asm.contains("sw t1, 0(t0)"));
    }

    #[test]
    fn static_load_materialises_address() {
        let mut fx = Fixture::new();
        let g = fx.sym("@x", Type::pointer(types::INT), Some(Storage::Static));
        fx.prog.globals.push(IrGlobal {
            sym: g,
            ty: types::INT,
        });
        let label = fx.sym(".L1", types::LABEL, None);
        let val = fx.sym("%1", types::INT, Some(treg(0)));
        let mut entry = BasicBlock::new(label);
        entry.push(IrInstr::Load { dst: val, src: g });
        entry.push(IrInstr::Ret { value: None });
        fx.func("@f", vec![entry]);
        emit(&mut fx.prog);
        let asm = fx.asm();
        assert!(asm.contains("la a0, x"));
        assert!(asm.contains("lw t0, 0(a0)"));
    }

    #[test]
    fn store_constant_to_global_uses_pseudo() {
        let mut fx = Fixture::new();
        let g = fx.sym("@x", Type::pointer(types::INT), Some(Storage::Static));
        fx.prog.globals.push(IrGlobal {
            sym: g,
            ty: types::INT,
        });
        let label = fx.sym(".L1", types::LABEL, None);
        let mut entry = BasicBlock::new(label);
        entry.push(IrInstr::Store {
            src: IrValue::Int(1),
            dst: g,
        });
        entry.push(IrInstr::Ret { value: None });
        fx.func("@f", vec![entry]);
        emit(&mut fx.prog);
        let asm = fx.asm();
        assert!(asm.contains("li t6, 1"));
        assert!(asm.contains("sw t6, x, a0"));
    }

    #[test]
    fn getelptr_shifts_and_adds() {
        let mut fx = Fixture::new();
        let label = fx.sym(".L1", types::LABEL, None);
        let arr = fx.sym(
            "%a",
            Type::pointer(Type::Array {
                base: BaseType::Int,
                len: 3,
            }),
            Some(treg(0)),
        );
        let el = fx.sym("%1", Type::pointer(types::INT), Some(treg(1)));
        let mut entry = BasicBlock::new(label);
        entry.push(IrInstr::GetElPtr {
            dst: el,
            base: arr,
            offset: IrValue::Int(2),
        });
        entry.push(IrInstr::Ret { value: None });
        fx.func("@f", vec![entry]);
        emit(&mut fx.prog);
        let asm = fx.asm();
        assert!(asm.contains("li t6, 2"));
        assert!(asm.contains("slli t6, t6, 2"));
        assert!(asm.contains("add t1, t0, t6"));
    }

    #[test]
    fn int_comparison_forms() {
        let mut fx = Fixture::new();
        let label = fx.sym(".L1", types::LABEL, None);
        let d_eq = fx.sym("%1", types::BOOL, Some(treg(0)));
        let d_le = fx.sym("%2", types::BOOL, Some(treg(1)));
        let mut entry = BasicBlock::new(label);
        entry.push(IrInstr::Binary {
            dst: d_eq,
            op: BinOp::Eq,
            lhs: IrValue::Int(1),
            rhs: IrValue::Int(2),
        });
        entry.push(IrInstr::Binary {
            dst: d_le,
            op: BinOp::Le,
            lhs: IrValue::Int(1),
            rhs: IrValue::Int(2),
        });
        entry.push(IrInstr::Ret { value: None });
        fx.func("@f", vec![entry]);
        emit(&mut fx.prog);
        let asm = fx.asm();
        // eq: xor then seqz
        assert!(asm.contains("xor t0, a0, a1"));
        assert!(asm.contains("seqz t0, t0"));
        // le: slt | (xor; seqz; or)
        assert!(asm.contains("slt t1, a0, a1"));
        assert!(asm.contains("or t1, t1, a0"));
    }

    #[test]
    fn float_binary_uses_float_file() {
        let mut fx = Fixture::new();
        let label = fx.sym(".L1", types::LABEL, None);
        let d = fx.sym(
            "%1",
            types::FLOAT,
            Some(Storage::Reg(Reg::Float(FloatReg::Ft0))),
        );
        let mut entry = BasicBlock::new(label);
        entry.push(IrInstr::Binary {
            dst: d,
            op: BinOp::Add,
            lhs: IrValue::Float(1.5),
            rhs: IrValue::Float(2.5),
        });
        entry.push(IrInstr::Ret { value: None });
        fx.func("@f", vec![entry]);
        emit(&mut fx.prog);
        let asm = fx.asm();
        assert!(asm.contains("fmv.w.x fa0, t6"));
        assert!(asm.contains("fmv.w.x fa1, t6"));
        assert!(asm.contains("fadd.s ft0, fa0, fa1"));
        // 1.5f bit pattern
        assert!(asm.contains(&format!("li t6, {}", 1.5f32.to_bits() as i32)));
    }

    #[test]
    fn branch_lowering() {
        let mut fx = Fixture::new();
        let l1 = fx.sym(".L1", types::LABEL, None);
        let l2 = fx.sym(".L2", types::LABEL, None);
        let l3 = fx.sym(".L3", types::LABEL, None);
        let c = fx.sym("%1", types::BOOL, Some(treg(0)));
        let mut entry = BasicBlock::new(l1);
        entry.push(IrInstr::Br {
            cond: IrValue::Sym(c),
            then_label: l2,
            else_label: l3,
        });
        let mut then_b = BasicBlock::new(l2);
        then_b.push(IrInstr::Jump { label: l3 });
        let mut end_b = BasicBlock::new(l3);
        end_b.push(IrInstr::Ret { value: None });
        fx.func("@f", vec![entry, then_b, end_b]);
        emit(&mut fx.prog);
        let asm = fx.asm();
        assert!(asm.contains("bnez t0, .L2"));
        assert!(asm.contains("beqz t0, .L3"));
        assert!(asm.contains("j .L3"));
    }

    #[test]
    fn conversions() {
        let mut fx = Fixture::new();
        let label = fx.sym(".L1", types::LABEL, None);
        let fl = fx.sym(
            "%1",
            types::FLOAT,
            Some(Storage::Reg(Reg::Float(FloatReg::Ft0))),
        );
        let i = fx.sym("%2", types::INT, Some(treg(0)));
        let mut entry = BasicBlock::new(label);
        entry.push(IrInstr::I2F {
            dst: fl,
            src: IrValue::Int(3),
        });
        entry.push(IrInstr::F2I {
            dst: i,
            src: IrValue::Sym(fl),
        });
        entry.push(IrInstr::Ret { value: None });
        fx.func("@f", vec![entry]);
        emit(&mut fx.prog);
        let asm = fx.asm();
        assert!(asm.contains("fcvt.s.w ft0, t6"));
        assert!(asm.contains("fcvt.w.s t0, ft0, rtz"));
    }

    #[test]
    fn direct_call_places_arguments_by_callee_convention() {
        let mut fx = Fixture::new();
        // Callee @g with two int register params.
        let p0 = fx.sym("@a", types::INT, Some(Storage::Reg(Reg::Int(IntReg::A0))));
        let p1 = fx.sym("@b", types::INT, Some(Storage::Reg(Reg::Int(IntReg::A1))));
        let gl = fx.sym(".L1", types::LABEL, None);
        let mut g_entry = BasicBlock::new(gl);
        g_entry.push(IrInstr::Ret { value: None });
        let g = fx.func("@g", vec![g_entry]);
        fx.prog.functions[g].params = vec![p0, p1];
        let g_sym = fx.prog.functions[g].sym;

        let fl = fx.sym(".L2", types::LABEL, None);
        let res = fx.sym("%1", types::INT, Some(treg(0)));
        let mut f_entry = BasicBlock::new(fl);
        f_entry.push(IrInstr::Call {
            result: Some(res),
            callee: g_sym,
            args: vec![IrValue::Int(1), IrValue::Int(2)],
            callee_func: Some(g),
        });
        f_entry.push(IrInstr::Ret { value: None });
        fx.func("@f", vec![f_entry]);
        emit(&mut fx.prog);

        let asm = fx.asm();
        assert!(asm.contains("mv a0, t6"));
        assert!(asm.contains("mv a1, t6"));
        assert!(asm.contains("jal ra, g"));
        assert!(asm.contains("mv t0, a0"));
    }

    #[test]
    fn indirect_call_goes_through_jalr() {
        let mut fx = Fixture::new();
        let addr = fx.sym(
            "%1",
            Type::pointer(Type::Func {
                ret: BaseType::Int,
                params: vec![types::INT],
            }),
            Some(treg(0)),
        );
        let res = fx.sym("%2", types::INT, Some(treg(1)));
        let label = fx.sym(".L1", types::LABEL, None);
        let mut entry = BasicBlock::new(label);
        entry.push(IrInstr::Call {
            result: Some(res),
            callee: addr,
            args: vec![IrValue::Int(1)],
            callee_func: None,
        });
        entry.push(IrInstr::Ret { value: None });
        fx.func("@f", vec![entry]);
        emit(&mut fx.prog);
        let asm = fx.asm();
        assert!(asm.contains("mv a0, t6"));
        assert!(asm.contains("jalr ra, 0(t0)"));
    }

    #[test]
    fn globals_render_as_bss_objects() {
        let mut fx = Fixture::new();
        let g = fx.sym(
            "@a",
            Type::pointer(Type::Array {
                base: BaseType::Int,
                len: 3,
            }),
            Some(Storage::Static),
        );
        fx.prog.globals.push(IrGlobal {
            sym: g,
            ty: Type::Array {
                base: BaseType::Int,
                len: 3,
            },
        });
        let asm = fx.asm();
        assert!(asm.contains("  .bss"));
        assert!(asm.contains(".type a, @object"));
        assert!(asm.contains(".size a, 12"));
        assert!(asm.contains("a:\n  .zero 12"));
    }

    #[test]
    fn function_wrapper_directives() {
        let mut fx = Fixture::new();
        let label = fx.sym(".L1", types::LABEL, None);
        let mut entry = BasicBlock::new(label);
        entry.push(IrInstr::Ret { value: None });
        fx.func("@main_fn", vec![entry]);
        emit(&mut fx.prog);
        let asm = fx.asm();
        assert!(asm.contains("  .globl main_fn"));
        assert!(asm.contains("  .type main_fn, @function"));
        assert!(asm.contains("main_fn:"));
        assert!(asm.contains("  .size main_fn, .-main_fn"));
    }
}
