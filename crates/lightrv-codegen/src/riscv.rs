//! RV32 register and instruction model.
//!
//! Instructions render to GNU-assembler text via `Display`. Constructors
//! check the immediate ranges the encodings allow: 12-bit signed for
//! `addi`/loads/stores, 5-bit unsigned for shifts.

use std::fmt;

/// Integer registers used by the emitter. `t6` is the integer scratch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntReg {
    Zero,
    Ra,
    Sp,
    Fp,
    A0,
    A1,
    A2,
    A3,
    A4,
    A5,
    A6,
    A7,
    T0,
    T1,
    T2,
    T3,
    T4,
    T5,
    T6,
}

impl IntReg {
    /// The i-th integer argument register, `a0..a7`.
    pub fn a(i: usize) -> Option<IntReg> {
        use IntReg::*;
        [A0, A1, A2, A3, A4, A5, A6, A7].get(i).copied()
    }

    /// The i-th integer temporary, `t0..t6`.
    pub fn t(i: usize) -> Option<IntReg> {
        use IntReg::*;
        [T0, T1, T2, T3, T4, T5, T6].get(i).copied()
    }

    /// Index within `t0..t5` if this is an allocatable temporary.
    pub fn temp_index(self) -> Option<usize> {
        use IntReg::*;
        [T0, T1, T2, T3, T4, T5].iter().position(|r| *r == self)
    }
}

impl fmt::Display for IntReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use IntReg::*;
        let name = match self {
            Zero => "zero",
            Ra => "ra",
            Sp => "sp",
            Fp => "fp",
            A0 => "a0",
            A1 => "a1",
            A2 => "a2",
            A3 => "a3",
            A4 => "a4",
            A5 => "a5",
            A6 => "a6",
            A7 => "a7",
            T0 => "t0",
            T1 => "t1",
            T2 => "t2",
            T3 => "t3",
            T4 => "t4",
            T5 => "t5",
            T6 => "t6",
        };
        write!(f, "{}", name)
    }
}

/// Floating-point registers. `ft11` is the float scratch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatReg {
    Fa0,
    Fa1,
    Fa2,
    Fa3,
    Fa4,
    Fa5,
    Fa6,
    Fa7,
    Ft0,
    Ft1,
    Ft2,
    Ft3,
    Ft4,
    Ft5,
    Ft6,
    Ft7,
    Ft8,
    Ft9,
    Ft10,
    Ft11,
}

impl FloatReg {
    /// The i-th float argument register, `fa0..fa7`.
    pub fn fa(i: usize) -> Option<FloatReg> {
        use FloatReg::*;
        [Fa0, Fa1, Fa2, Fa3, Fa4, Fa5, Fa6, Fa7].get(i).copied()
    }

    /// The i-th float temporary, `ft0..ft11`.
    pub fn ft(i: usize) -> Option<FloatReg> {
        use FloatReg::*;
        [Ft0, Ft1, Ft2, Ft3, Ft4, Ft5, Ft6, Ft7, Ft8, Ft9, Ft10, Ft11]
            .get(i)
            .copied()
    }

    /// Index within `ft0..ft10` if this is an allocatable temporary.
    pub fn temp_index(self) -> Option<usize> {
        use FloatReg::*;
        [Ft0, Ft1, Ft2, Ft3, Ft4, Ft5, Ft6, Ft7, Ft8, Ft9, Ft10]
            .iter()
            .position(|r| *r == self)
    }
}

impl fmt::Display for FloatReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use FloatReg::*;
        let name = match self {
            Fa0 => "fa0",
            Fa1 => "fa1",
            Fa2 => "fa2",
            Fa3 => "fa3",
            Fa4 => "fa4",
            Fa5 => "fa5",
            Fa6 => "fa6",
            Fa7 => "fa7",
            Ft0 => "ft0",
            Ft1 => "ft1",
            Ft2 => "ft2",
            Ft3 => "ft3",
            Ft4 => "ft4",
            Ft5 => "ft5",
            Ft6 => "ft6",
            Ft7 => "ft7",
            Ft8 => "ft8",
            Ft9 => "ft9",
            Ft10 => "ft10",
            Ft11 => "ft11",
        };
        write!(f, "{}", name)
    }
}

/// Either register file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reg {
    Int(IntReg),
    Float(FloatReg),
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reg::Int(r) => write!(f, "{}", r),
            Reg::Float(r) => write!(f, "{}", r),
        }
    }
}

/// Register-register ALU operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegOp {
    Add,
    Sub,
    Mul,
    Slt,
    Xor,
    Or,
    And,
}

impl RegOp {
    fn mnemonic(self) -> &'static str {
        match self {
            RegOp::Add => "add",
            RegOp::Sub => "sub",
            RegOp::Mul => "mul",
            RegOp::Slt => "slt",
            RegOp::Xor => "xor",
            RegOp::Or => "or",
            RegOp::And => "and",
        }
    }
}

/// Register-immediate ALU operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImmOp {
    Addi,
    Slli,
    Srli,
    Slti,
    Andi,
    Ori,
    Xori,
}

impl ImmOp {
    fn mnemonic(self) -> &'static str {
        match self {
            ImmOp::Addi => "addi",
            ImmOp::Slli => "slli",
            ImmOp::Srli => "srli",
            ImmOp::Slti => "slti",
            ImmOp::Andi => "andi",
            ImmOp::Ori => "ori",
            ImmOp::Xori => "xori",
        }
    }

    fn is_shift(self) -> bool {
        matches!(self, ImmOp::Slli | ImmOp::Srli)
    }
}

/// Single-precision float binary operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FBinOp {
    Fadd,
    Fsub,
    Fmul,
    Fdiv,
}

impl FBinOp {
    fn mnemonic(self) -> &'static str {
        match self {
            FBinOp::Fadd => "fadd.s",
            FBinOp::Fsub => "fsub.s",
            FBinOp::Fmul => "fmul.s",
            FBinOp::Fdiv => "fdiv.s",
        }
    }
}

/// Single-precision float comparisons; the result lands in an integer
/// register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FCmpOp {
    Feq,
    Flt,
    Fle,
}

impl FCmpOp {
    fn mnemonic(self) -> &'static str {
        match self {
            FCmpOp::Feq => "feq.s",
            FCmpOp::Flt => "flt.s",
            FCmpOp::Fle => "fle.s",
        }
    }
}

/// One assembly instruction (or pseudo-instruction).
#[derive(Debug, Clone, PartialEq)]
pub enum RvInstr {
    Reg {
        op: RegOp,
        rd: IntReg,
        rs1: IntReg,
        rs2: IntReg,
    },
    Imm {
        op: ImmOp,
        rd: IntReg,
        rs1: IntReg,
        imm: i32,
    },
    Li {
        rd: IntReg,
        imm: i32,
    },
    La {
        rd: IntReg,
        label: String,
    },
    Mv {
        rd: IntReg,
        rs: IntReg,
    },
    Seqz {
        rd: IntReg,
        rs: IntReg,
    },
    Snez {
        rd: IntReg,
        rs: IntReg,
    },
    Lw {
        rd: IntReg,
        base: IntReg,
        offset: i32,
    },
    Sw {
        rs: IntReg,
        base: IntReg,
        offset: i32,
    },
    Flw {
        rd: FloatReg,
        base: IntReg,
        offset: i32,
    },
    Fsw {
        rs: FloatReg,
        base: IntReg,
        offset: i32,
    },
    /// Store to a named object: `sw rs, label, tmp`.
    SwGlobal {
        rs: IntReg,
        label: String,
        tmp: IntReg,
    },
    /// Float store to a named object: `fsw rs, label, tmp`.
    FswGlobal {
        rs: FloatReg,
        label: String,
        tmp: IntReg,
    },
    FmvS {
        rd: FloatReg,
        rs: FloatReg,
    },
    /// Move a 32-bit integer pattern into a float register.
    FmvWX {
        rd: FloatReg,
        rs: IntReg,
    },
    /// `fcvt.s.w`: signed int to single float.
    FcvtSW {
        rd: FloatReg,
        rs: IntReg,
    },
    /// `fcvt.w.s …, rtz`: single float to signed int, truncating.
    FcvtWS {
        rd: IntReg,
        rs: FloatReg,
    },
    FBin {
        op: FBinOp,
        rd: FloatReg,
        rs1: FloatReg,
        rs2: FloatReg,
    },
    FCmp {
        op: FCmpOp,
        rd: IntReg,
        rs1: FloatReg,
        rs2: FloatReg,
    },
    Beqz {
        rs: IntReg,
        label: String,
    },
    Bnez {
        rs: IntReg,
        label: String,
    },
    J {
        label: String,
    },
    Jal {
        rd: IntReg,
        label: String,
    },
    Jalr {
        rd: IntReg,
        rs: IntReg,
        offset: i32,
    },
    Ret,
}

/// 12-bit signed immediate range for `addi`/loads/stores.
fn check_imm12(imm: i32) {
    debug_assert!((-2048..=2047).contains(&imm), "immediate {} out of range", imm);
}

impl RvInstr {
    pub fn imm(op: ImmOp, rd: IntReg, rs1: IntReg, imm: i32) -> RvInstr {
        if op.is_shift() {
            debug_assert!((0..32).contains(&imm), "shift amount {} out of range", imm);
        } else {
            check_imm12(imm);
        }
        RvInstr::Imm { op, rd, rs1, imm }
    }

    pub fn lw(rd: IntReg, base: IntReg, offset: i32) -> RvInstr {
        check_imm12(offset);
        RvInstr::Lw { rd, base, offset }
    }

    pub fn sw(rs: IntReg, base: IntReg, offset: i32) -> RvInstr {
        check_imm12(offset);
        RvInstr::Sw { rs, base, offset }
    }

    pub fn flw(rd: FloatReg, base: IntReg, offset: i32) -> RvInstr {
        check_imm12(offset);
        RvInstr::Flw { rd, base, offset }
    }

    pub fn fsw(rs: FloatReg, base: IntReg, offset: i32) -> RvInstr {
        check_imm12(offset);
        RvInstr::Fsw { rs, base, offset }
    }

    pub fn jalr(rd: IntReg, rs: IntReg, offset: i32) -> RvInstr {
        check_imm12(offset);
        RvInstr::Jalr { rd, rs, offset }
    }
}

impl fmt::Display for RvInstr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RvInstr::Reg { op, rd, rs1, rs2 } => {
                write!(f, "{} {}, {}, {}", op.mnemonic(), rd, rs1, rs2)
            }
            RvInstr::Imm { op, rd, rs1, imm } => {
                write!(f, "{} {}, {}, {}", op.mnemonic(), rd, rs1, imm)
            }
            RvInstr::Li { rd, imm } => write!(f, "li {}, {}", rd, imm),
            RvInstr::La { rd, label } => write!(f, "la {}, {}", rd, label),
            RvInstr::Mv { rd, rs } => write!(f, "mv {}, {}", rd, rs),
            RvInstr::Seqz { rd, rs } => write!(f, "seqz {}, {}", rd, rs),
            RvInstr::Snez { rd, rs } => write!(f, "snez {}, {}", rd, rs),
            RvInstr::Lw { rd, base, offset } => write!(f, "lw {}, {}({})", rd, offset, base),
            RvInstr::Sw { rs, base, offset } => write!(f, "sw {}, {}({})", rs, offset, base),
            RvInstr::Flw { rd, base, offset } => write!(f, "flw {}, {}({})", rd, offset, base),
            RvInstr::Fsw { rs, base, offset } => write!(f, "fsw {}, {}({})", rs, offset, base),
            RvInstr::SwGlobal { rs, label, tmp } => write!(f, "sw {}, {}, {}", rs, label, tmp),
            RvInstr::FswGlobal { rs, label, tmp } => write!(f, "fsw {}, {}, {}", rs, label, tmp),
            RvInstr::FmvS { rd, rs } => write!(f, "fmv.s {}, {}", rd, rs),
            RvInstr::FmvWX { rd, rs } => write!(f, "fmv.w.x {}, {}", rd, rs),
            RvInstr::FcvtSW { rd, rs } => write!(f, "fcvt.s.w {}, {}", rd, rs),
            RvInstr::FcvtWS { rd, rs } => write!(f, "fcvt.w.s {}, {}, rtz", rd, rs),
            RvInstr::FBin { op, rd, rs1, rs2 } => {
                write!(f, "{} {}, {}, {}", op.mnemonic(), rd, rs1, rs2)
            }
            RvInstr::FCmp { op, rd, rs1, rs2 } => {
                write!(f, "{} {}, {}, {}", op.mnemonic(), rd, rs1, rs2)
            }
            RvInstr::Beqz { rs, label } => write!(f, "beqz {}, {}", rs, label),
            RvInstr::Bnez { rs, label } => write!(f, "bnez {}, {}", rs, label),
            RvInstr::J { label } => write!(f, "j {}", label),
            RvInstr::Jal { rd, label } => write!(f, "jal {}, {}", rd, label),
            RvInstr::Jalr { rd, rs, offset } => write!(f, "jalr {}, {}({})", rd, offset, rs),
            RvInstr::Ret => write!(f, "ret"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_names() {
        assert_eq!(format!("{}", IntReg::T6), "t6");
        assert_eq!(format!("{}", IntReg::Fp), "fp");
        assert_eq!(format!("{}", FloatReg::Ft11), "ft11");
        assert_eq!(format!("{}", FloatReg::Fa0), "fa0");
    }

    #[test]
    fn argument_register_lookup() {
        assert_eq!(IntReg::a(0), Some(IntReg::A0));
        assert_eq!(IntReg::a(7), Some(IntReg::A7));
        assert_eq!(IntReg::a(8), None);
        assert_eq!(FloatReg::fa(7), Some(FloatReg::Fa7));
        assert_eq!(FloatReg::fa(8), None);
    }

    #[test]
    fn temp_indices_exclude_scratch() {
        assert_eq!(IntReg::T5.temp_index(), Some(5));
        assert_eq!(IntReg::T6.temp_index(), None);
        assert_eq!(FloatReg::Ft10.temp_index(), Some(10));
        assert_eq!(FloatReg::Ft11.temp_index(), None);
    }

    #[test]
    fn render_memory_and_alu_forms() {
        assert_eq!(
            format!("{}", RvInstr::lw(IntReg::T0, IntReg::Fp, -12)),
            "lw t0, -12(fp)"
        );
        assert_eq!(
            format!(
                "{}",
                RvInstr::Reg {
                    op: RegOp::Add,
                    rd: IntReg::T0,
                    rs1: IntReg::A0,
                    rs2: IntReg::T6
                }
            ),
            "add t0, a0, t6"
        );
        assert_eq!(
            format!("{}", RvInstr::imm(ImmOp::Slli, IntReg::T6, IntReg::T6, 2)),
            "slli t6, t6, 2"
        );
    }

    #[test]
    fn render_float_and_control_forms() {
        assert_eq!(
            format!("{}", RvInstr::FcvtWS { rd: IntReg::A0, rs: FloatReg::Fa0 }),
            "fcvt.w.s a0, fa0, rtz"
        );
        assert_eq!(
            format!("{}", RvInstr::FmvWX { rd: FloatReg::Fa1, rs: IntReg::T6 }),
            "fmv.w.x fa1, t6"
        );
        assert_eq!(
            format!("{}", RvInstr::Jal { rd: IntReg::Ra, label: "f".to_string() }),
            "jal ra, f"
        );
        assert_eq!(
            format!("{}", RvInstr::jalr(IntReg::Ra, IntReg::T6, 0)),
            "jalr ra, 0(t6)"
        );
        assert_eq!(
            format!("{}", RvInstr::Bnez { rs: IntReg::T6, label: ".L2".to_string() }),
            "bnez t6, .L2"
        );
    }

    #[test]
    fn global_store_pseudo() {
        let i = RvInstr::SwGlobal {
            rs: IntReg::T6,
            label: "x".to_string(),
            tmp: IntReg::A0,
        };
        assert_eq!(format!("{}", i), "sw t6, x, a0");
    }

    #[test]
    #[should_panic]
    fn out_of_range_offset_is_rejected() {
        let _ = RvInstr::lw(IntReg::T0, IntReg::Fp, 4096);
    }
}
