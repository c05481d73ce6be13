//! Back end: typed three-address IR, register allocation and RV32 assembly
//! emission.
//!
//! The pipeline through this crate is [`lower::lower`] (typed AST to IR),
//! [`regalloc::allocate`] (storage assignment and frame layout), then
//! [`emit::emit`] and [`emit::render`] (machine code and assembly text).

pub mod emit;
pub mod ir;
pub mod lower;
pub mod regalloc;
pub mod riscv;

pub use emit::{emit, render};
pub use ir::{BasicBlock, IrFunc, IrGlobal, IrId, IrInstr, IrProgram, IrSym, IrValue, Storage};
pub use lower::lower;
pub use regalloc::allocate;
pub use riscv::{FloatReg, IntReg, Reg, RvInstr};
