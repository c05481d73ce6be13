//! Per-block graph-colouring register allocation.
//!
//! Storage classes: registers, stack slots at negative frame-pointer
//! offsets, and static storage for globals and function labels. Parameters
//! follow the calling convention (first eight of each class in registers,
//! the rest in the incoming stack area). Within each basic block the
//! remaining temporaries are coloured greedily over an interference graph,
//! once for the integer file and once for the float file.
//!
//! Colour budgets: six integer temporaries `t0..t5` (`t6` is scratch) and
//! eleven float temporaries `ft0..ft10` (`ft11` is scratch). A node whose
//! degree reaches the budget spills to a fresh stack slot immediately.
//!
//! Every register in the colour set is caller-saved under the RV32
//! convention, and the model carries no callee-saved class, so a callee is
//! free to clobber all of them. Any value still live after a call therefore
//! spills to a frame slot before its block is coloured; only call-free
//! ranges compete for registers. Argument registers are never in the colour
//! set at all.

use petgraph::graph::{NodeIndex, UnGraph};
use std::collections::HashMap;

use crate::ir::{BasicBlock, IrId, IrInstr, IrProgram, IrValue, Storage};
use crate::riscv::{FloatReg, IntReg, Reg};

const INT_BUDGET: usize = 6;
const FLOAT_BUDGET: usize = 11;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RegClass {
    Int,
    Float,
}

impl RegClass {
    fn budget(self) -> usize {
        match self {
            RegClass::Int => INT_BUDGET,
            RegClass::Float => FLOAT_BUDGET,
        }
    }

    /// Class of a symbol: float scalars use the float file, everything else
    /// (ints, bools, pointers) the integer file.
    fn of(prog: &IrProgram, id: IrId) -> RegClass {
        if prog.sym(id).ty.is_float() {
            RegClass::Float
        } else {
            RegClass::Int
        }
    }

    fn nth_reg(self, i: usize) -> Option<Reg> {
        match self {
            RegClass::Int => IntReg::t(i).map(Reg::Int),
            RegClass::Float => FloatReg::ft(i).map(Reg::Float),
        }
    }

    fn reg_index(self, reg: Reg) -> Option<usize> {
        match (self, reg) {
            (RegClass::Int, Reg::Int(r)) => r.temp_index(),
            (RegClass::Float, Reg::Float(r)) => r.temp_index(),
            _ => None,
        }
    }
}

/// Assign storage to every symbol in the program and compute frame sizes.
pub fn allocate(prog: &mut IrProgram) {
    // Globals and function labels resolve by name.
    for i in 0..prog.globals.len() {
        let sym = prog.globals[i].sym;
        prog.sym_mut(sym).storage = Some(Storage::Static);
    }
    for i in 0..prog.functions.len() {
        let sym = prog.functions[i].sym;
        prog.sym_mut(sym).storage = Some(Storage::Static);
    }

    // Parameter conventions first, for every function: a caller needs its
    // callee's stack-argument area before its own frame can be sized.
    for i in 0..prog.functions.len() {
        assign_params(prog, i);
    }

    for i in 0..prog.functions.len() {
        allocate_frame(prog, i);
    }
}

/// First eight ints to `a0..a7`, first eight floats to `fa0..fa7`, the rest
/// to consecutive 4-byte slots in the incoming stack area.
fn assign_params(prog: &mut IrProgram, func: usize) {
    let params = prog.functions[func].params.clone();
    let mut int_count = 0usize;
    let mut float_count = 0usize;
    let mut stack_count = 0i32;
    for param in params {
        let storage = match RegClass::of(prog, param) {
            RegClass::Float => match FloatReg::fa(float_count) {
                Some(reg) => {
                    float_count += 1;
                    Storage::Reg(Reg::Float(reg))
                }
                None => {
                    let slot = Storage::Stack(4 * stack_count);
                    stack_count += 1;
                    slot
                }
            },
            RegClass::Int => match IntReg::a(int_count) {
                Some(reg) => {
                    int_count += 1;
                    Storage::Reg(Reg::Int(reg))
                }
                None => {
                    let slot = Storage::Stack(4 * stack_count);
                    stack_count += 1;
                    slot
                }
            },
        };
        prog.sym_mut(param).storage = Some(storage);
    }
    prog.functions[func].param_area = 4 * stack_count;
}

fn allocate_frame(prog: &mut IrProgram, func: usize) {
    // Lay out the entry block's allocs below the saved ra/fp pair.
    let mut cur_size = -8i32;
    {
        let function = &mut prog.functions[func];
        if let Some(entry) = function.blocks.first_mut() {
            for instr in &mut entry.instrs {
                if let IrInstr::Alloc { ty, position, .. } = instr {
                    cur_size -= ty.size_in_bytes();
                    *position = Some(cur_size);
                }
            }
        }
    }

    // Colour each block, integers then floats.
    let block_count = prog.functions[func].blocks.len();
    for b in 0..block_count {
        cur_size = color_block(prog, func, b, cur_size, RegClass::Int);
        cur_size = color_block(prog, func, b, cur_size, RegClass::Float);
    }

    // Outgoing argument area: the widest stack-argument need across all
    // calls this function makes.
    let mut arg_size = 0i32;
    let calls = prog.functions[func].calls.clone();
    for callee in calls {
        arg_size = arg_size.max(prog.functions[callee].param_area);
    }
    for block in &prog.functions[func].blocks {
        for instr in &block.instrs {
            if let IrInstr::Call {
                callee_func: None,
                args,
                ..
            } = instr
            {
                arg_size = arg_size.max(indirect_stack_need(prog, args));
            }
        }
    }

    prog.functions[func].frame_size = cur_size - arg_size;
}

/// Stack bytes an indirect call needs for arguments beyond the register
/// conventions.
fn indirect_stack_need(prog: &IrProgram, args: &[IrValue]) -> i32 {
    let mut int_count = 0i32;
    let mut float_count = 0i32;
    for arg in args {
        if prog.value_type(arg).is_float() {
            float_count += 1;
        } else {
            int_count += 1;
        }
    }
    4 * ((int_count - 8).max(0) + (float_count - 8).max(0))
}

/// Colour one block's storage-less symbols of one register class. Returns
/// the updated frame low-water mark.
fn color_block(
    prog: &mut IrProgram,
    func: usize,
    block_index: usize,
    mut cur_size: i32,
    class: RegClass,
) -> i32 {
    // The callee may clobber the whole temp pool, so whatever is still live
    // after a call goes straight to the frame. A call's own result does not
    // cross it: the move out of a0/fa0 happens after the callee returns.
    let live = block_liveness(prog, &prog.functions[func].blocks[block_index], class);
    let mut crossers: Vec<IrId> = Vec::new();
    for (i, instr) in prog.functions[func].blocks[block_index]
        .instrs
        .iter()
        .enumerate()
    {
        if !matches!(instr, IrInstr::Call { .. }) {
            continue;
        }
        let defs = instr.defs();
        for id in &live[i + 1] {
            if !defs.contains(id) && !crossers.contains(id) {
                crossers.push(*id);
            }
        }
    }
    for id in crossers {
        cur_size -= 4;
        prog.sym_mut(id).storage = Some(Storage::Stack(cur_size));
    }

    let live = block_liveness(prog, &prog.functions[func].blocks[block_index], class);

    // Interference graph over the symbols defined or live here: two nodes
    // interfere iff both are live at some program point.
    let mut graph: UnGraph<IrId, ()> = UnGraph::new_undirected();
    let mut nodes: HashMap<IrId, NodeIndex> = HashMap::new();
    let mut order: Vec<IrId> = Vec::new();
    for instr in &prog.functions[func].blocks[block_index].instrs {
        for def in instr.defs() {
            if RegClass::of(prog, def) == class
                && prog.storage(def).is_none()
                && !nodes.contains_key(&def)
            {
                let idx = graph.add_node(def);
                nodes.insert(def, idx);
                order.push(def);
            }
        }
    }
    for point in &live {
        for (i, a) in point.iter().enumerate() {
            for b in &point[i + 1..] {
                if let (Some(&na), Some(&nb)) = (nodes.get(a), nodes.get(b)) {
                    graph.update_edge(na, nb, ());
                }
            }
        }
    }
    // Live-only symbols (used before any storage was assigned elsewhere)
    // also need nodes and colours.
    for point in &live {
        for id in point {
            if !nodes.contains_key(id) {
                let idx = graph.add_node(*id);
                nodes.insert(*id, idx);
                order.push(*id);
            }
        }
    }
    for point in &live {
        for (i, a) in point.iter().enumerate() {
            for b in &point[i + 1..] {
                let (na, nb) = (nodes[a], nodes[b]);
                graph.update_edge(na, nb, ());
            }
        }
    }

    // Simplify in ascending-degree order: removable nodes go onto the
    // stack, everything else spills immediately.
    let mut by_degree: Vec<IrId> = order.clone();
    by_degree.sort_by_key(|id| graph.neighbors(nodes[id]).count());

    let mut removed: Vec<IrId> = Vec::new();
    let mut stack: Vec<IrId> = Vec::new();
    for id in &by_degree {
        let degree = graph
            .neighbors(nodes[id])
            .filter(|n| !removed.contains(&graph[*n]))
            .count();
        if degree < class.budget() {
            stack.push(*id);
        } else {
            cur_size -= 4;
            prog.sym_mut(*id).storage = Some(Storage::Stack(cur_size));
        }
        removed.push(*id);
    }

    // Pop in LIFO order; each node takes the lowest register no coloured
    // neighbour holds. The edges were kept intact, so the same graph serves
    // both phases.
    while let Some(id) = stack.pop() {
        let mut taken = 0u32;
        for neighbor in graph.neighbors(nodes[&id]) {
            let other = graph[neighbor];
            if let Some(Storage::Reg(reg)) = prog.storage(other) {
                if let Some(i) = class.reg_index(reg) {
                    taken |= 1 << i;
                }
            }
        }
        let mut i = 0usize;
        while taken & (1 << i) != 0 {
            i += 1;
        }
        if let Some(reg) = class.nth_reg(i) {
            prog.sym_mut(id).storage = Some(Storage::Reg(reg));
        }
    }

    cur_size
}

/// Backwards liveness over the block's non-terminator instructions. A
/// symbol is live-in to an instruction if it is used there or live below
/// without being defined there; only symbols with no storage yet
/// participate.
fn block_liveness(prog: &IrProgram, block: &BasicBlock, class: RegClass) -> Vec<Vec<IrId>> {
    let n = block.instrs.len();
    let mut live: Vec<Vec<IrId>> = vec![Vec::new(); n + 1];
    for i in (0..n).rev() {
        let instr = &block.instrs[i];
        let defs = instr.defs();
        let mut here: Vec<IrId> = Vec::new();
        for id in &live[i + 1] {
            if defs.contains(id) {
                continue;
            }
            here.push(*id);
        }
        for id in instr.uses() {
            if RegClass::of(prog, id) != class {
                continue;
            }
            if prog.storage(id).is_some() {
                continue;
            }
            if !here.contains(&id) {
                here.push(id);
            }
        }
        live[i] = here;
    }
    live
}

#[cfg(test)]
mod tests {
    use super::*;
    use lightrv_core::ast::BinOp;
    use lightrv_core::types::{self, Type};
    use std::collections::BTreeSet;

    use crate::ir::{BasicBlock, IrFunc, IrGlobal, IrSym};

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

        fn sym(&mut self, name: &str, ty: Type) -> IrId {
            let id = IrId(self.prog.syms.len() as u32);
            self.prog.syms.push(IrSym {
                name: name.to_string(),
                ty,
                storage: None,
            });
            id
        }

        fn func(&mut self, name: &str, params: Vec<IrId>, blocks: Vec<BasicBlock>) -> usize {
            let sym = self.sym(
                name,
                Type::Func {
                    ret: lightrv_core::types::BaseType::Void,
                    params: Vec::new(),
                },
            );
            let epilogue_label = self.sym(".Lret", types::LABEL);
            self.prog.functions.push(IrFunc {
                sym,
                params,
                blocks,
                entry: Vec::new(),
                epilogue_label,
                epilogue: Vec::new(),
                frame_size: 0,
                param_area: 0,
                calls: BTreeSet::new(),
            });
            self.prog.functions.len() - 1
        }
    }

    #[test]
    fn globals_and_functions_become_static() {
        let mut fx = Fixture::new();
        let g = fx.sym("@x", Type::pointer(types::INT));
        fx.prog.globals.push(IrGlobal {
            sym: g,
            ty: types::INT,
        });
        fx.func("@f", vec![], vec![BasicBlock::new(g)]);
        allocate(&mut fx.prog);
        assert_eq!(fx.prog.storage(g), Some(Storage::Static));
        let fsym = fx.prog.functions[0].sym;
        assert_eq!(fx.prog.storage(fsym), Some(Storage::Static));
    }

    #[test]
    fn first_eight_int_params_take_argument_registers() {
        let mut fx = Fixture::new();
        let params: Vec<IrId> = (0..9)
            .map(|i| fx.sym(&format!("@p{}", i), types::INT))
            .collect();
        let entry = BasicBlock::new(params[0]);
        fx.func("@f", params.clone(), vec![entry]);
        allocate(&mut fx.prog);
        assert_eq!(
            fx.prog.storage(params[0]),
            Some(Storage::Reg(Reg::Int(IntReg::A0)))
        );
        assert_eq!(
            fx.prog.storage(params[7]),
            Some(Storage::Reg(Reg::Int(IntReg::A7)))
        );
        // The ninth spills into the incoming stack area.
        assert_eq!(fx.prog.storage(params[8]), Some(Storage::Stack(0)));
        assert_eq!(fx.prog.functions[0].param_area, 4);
    }

    #[test]
    fn float_params_use_the_float_file() {
        let mut fx = Fixture::new();
        let f0 = fx.sym("@f0", types::FLOAT);
        let i0 = fx.sym("@i0", types::INT);
        let entry = BasicBlock::new(f0);
        fx.func("@f", vec![f0, i0], vec![entry]);
        allocate(&mut fx.prog);
        assert_eq!(
            fx.prog.storage(f0),
            Some(Storage::Reg(Reg::Float(FloatReg::Fa0)))
        );
        assert_eq!(
            fx.prog.storage(i0),
            Some(Storage::Reg(Reg::Int(IntReg::A0)))
        );
    }

    #[test]
    fn entry_allocs_descend_from_minus_eight() {
        let mut fx = Fixture::new();
        let label = fx.sym(".L1", types::LABEL);
        let x = fx.sym("%x", Type::pointer(types::INT));
        let a = fx.sym(
            "%a",
            Type::pointer(Type::Array {
                base: lightrv_core::types::BaseType::Int,
                len: 3,
            }),
        );
        let mut entry = BasicBlock::new(label);
        entry.push(IrInstr::Alloc {
            dst: x,
            ty: types::INT,
            position: None,
        });
        entry.push(IrInstr::Alloc {
            dst: a,
            ty: Type::Array {
                base: lightrv_core::types::BaseType::Int,
                len: 3,
            },
            position: None,
        });
        entry.push(IrInstr::Ret { value: None });
        let f = fx.func("@f", vec![], vec![entry]);
        allocate(&mut fx.prog);
        let blocks = &fx.prog.functions[f].blocks;
        match (&blocks[0].instrs[0], &blocks[0].instrs[1]) {
            (
                IrInstr::Alloc {
                    position: Some(p1), ..
                },
                IrInstr::Alloc {
                    position: Some(p2), ..
                },
            ) => {
                assert_eq!(*p1, -12);
                assert_eq!(*p2, -24);
            }
            other => panic!("expected two positioned allocs, got {:?}", other),
        }
        assert_eq!(fx.prog.functions[f].frame_size, -24);
    }

    #[test]
    fn interfering_temps_get_distinct_registers() {
        let mut fx = Fixture::new();
        let label = fx.sym(".L1", types::LABEL);
        let a = fx.sym("%1", types::INT);
        let b = fx.sym("%2", types::INT);
        let c = fx.sym("%3", types::INT);
        let mut entry = BasicBlock::new(label);
        // a and b are both live until the final add.
        entry.push(IrInstr::Binary {
            dst: a,
            op: BinOp::Add,
            lhs: IrValue::Int(1),
            rhs: IrValue::Int(2),
        });
        entry.push(IrInstr::Binary {
            dst: b,
            op: BinOp::Add,
            lhs: IrValue::Int(3),
            rhs: IrValue::Int(4),
        });
        entry.push(IrInstr::Binary {
            dst: c,
            op: BinOp::Add,
            lhs: IrValue::Sym(a),
            rhs: IrValue::Sym(b),
        });
        entry.push(IrInstr::Ret { value: None });
        fx.func("@f", vec![], vec![entry]);
        allocate(&mut fx.prog);

        let ra = fx.prog.storage(a);
        let rb = fx.prog.storage(b);
        assert!(matches!(ra, Some(Storage::Reg(Reg::Int(_)))));
        assert!(matches!(rb, Some(Storage::Reg(Reg::Int(_)))));
        assert_ne!(ra, rb);
    }

    #[test]
    fn float_temps_never_take_integer_registers() {
        let mut fx = Fixture::new();
        let label = fx.sym(".L1", types::LABEL);
        let f = fx.sym("%1", types::FLOAT);
        let mut entry = BasicBlock::new(label);
        entry.push(IrInstr::Binary {
            dst: f,
            op: BinOp::Add,
            lhs: IrValue::Float(1.0),
            rhs: IrValue::Float(2.0),
        });
        entry.push(IrInstr::Ret { value: None });
        fx.func("@f", vec![], vec![entry]);
        allocate(&mut fx.prog);
        assert!(matches!(
            fx.prog.storage(f),
            Some(Storage::Reg(Reg::Float(_)))
        ));
    }

    #[test]
    fn frame_size_covers_callee_stack_arguments() {
        let mut fx = Fixture::new();
        // Callee with nine int params: 4 bytes of stack-passed arguments.
        let params: Vec<IrId> = (0..9)
            .map(|i| fx.sym(&format!("@p{}", i), types::INT))
            .collect();
        let l1 = fx.sym(".L1", types::LABEL);
        let mut callee_entry = BasicBlock::new(l1);
        callee_entry.push(IrInstr::Ret { value: None });
        let callee = fx.func("@g", params, vec![callee_entry]);

        let l2 = fx.sym(".L2", types::LABEL);
        let callee_sym = fx.prog.functions[callee].sym;
        let mut caller_entry = BasicBlock::new(l2);
        caller_entry.push(IrInstr::Call {
            result: None,
            callee: callee_sym,
            args: (0..9).map(IrValue::Int).collect(),
            callee_func: Some(callee),
        });
        caller_entry.push(IrInstr::Ret { value: None });
        let caller = fx.func("@f", vec![], vec![caller_entry]);
        fx.prog.functions[caller].calls.insert(callee);

        allocate(&mut fx.prog);
        // -8 for ra/fp, -4 for the callee's stack argument.
        assert_eq!(fx.prog.functions[caller].frame_size, -12);
    }

    #[test]
    fn many_simultaneous_temps_spill() {
        let mut fx = Fixture::new();
        let label = fx.sym(".L1", types::LABEL);
        let temps: Vec<IrId> = (0..8).map(|i| fx.sym(&format!("%{}", i), types::INT)).collect();
        let sink = fx.sym("%sink", types::INT);
        let mut entry = BasicBlock::new(label);
        for t in &temps {
            entry.push(IrInstr::Binary {
                dst: *t,
                op: BinOp::Add,
                lhs: IrValue::Int(1),
                rhs: IrValue::Int(1),
            });
        }
        // One instruction using all eight keeps them simultaneously live.
        let mut args: Vec<IrValue> = temps.iter().map(|t| IrValue::Sym(*t)).collect();
        args.push(IrValue::Sym(sink));
        entry.push(IrInstr::Call {
            result: Some(sink),
            callee: temps[0],
            args,
            callee_func: None,
        });
        entry.push(IrInstr::Ret { value: None });
        fx.func("@f", vec![], vec![entry]);
        allocate(&mut fx.prog);

        let spilled = temps
            .iter()
            .filter(|t| matches!(fx.prog.storage(**t), Some(Storage::Stack(_))))
            .count();
        assert!(spilled >= 2, "eight live temps cannot all fit in six registers");
        // Whatever was coloured must be within t0..t5.
        for t in &temps {
            if let Some(Storage::Reg(Reg::Int(r))) = fx.prog.storage(*t) {
                assert!(r.temp_index().is_some());
            }
        }
    }

    #[test]
    fn value_live_across_a_call_is_spilled() {
        // The callee colours its own temps from the same caller-saved pool,
        // so a value that must survive the call cannot stay in a register.
        let mut fx = Fixture::new();
        let gl = fx.sym(".L1", types::LABEL);
        let mut g_entry = BasicBlock::new(gl);
        g_entry.push(IrInstr::Ret { value: None });
        let g = fx.func("@g", vec![], vec![g_entry]);
        let g_sym = fx.prog.functions[g].sym;

        let fl = fx.sym(".L2", types::LABEL);
        let a = fx.sym("%1", types::INT);
        let b = fx.sym("%2", types::INT);
        let mut entry = BasicBlock::new(fl);
        entry.push(IrInstr::Binary {
            dst: a,
            op: BinOp::Add,
            lhs: IrValue::Int(1),
            rhs: IrValue::Int(2),
        });
        entry.push(IrInstr::Call {
            result: None,
            callee: g_sym,
            args: vec![],
            callee_func: Some(g),
        });
        entry.push(IrInstr::Binary {
            dst: b,
            op: BinOp::Add,
            lhs: IrValue::Sym(a),
            rhs: IrValue::Int(3),
        });
        entry.push(IrInstr::Ret { value: None });
        fx.func("@f", vec![], vec![entry]);
        allocate(&mut fx.prog);

        assert!(
            matches!(fx.prog.storage(a), Some(Storage::Stack(_))),
            "call-crossing value must live in the frame, got {:?}",
            fx.prog.storage(a)
        );
        // The post-call temporary has no call to survive.
        assert!(matches!(fx.prog.storage(b), Some(Storage::Reg(Reg::Int(_)))));
    }

    #[test]
    fn call_result_does_not_count_as_crossing() {
        // The result is written out of a0 after the callee returns, so it
        // may take a temporary.
        let mut fx = Fixture::new();
        let gl = fx.sym(".L1", types::LABEL);
        let mut g_entry = BasicBlock::new(gl);
        g_entry.push(IrInstr::Ret { value: None });
        let g = fx.func("@g", vec![], vec![g_entry]);
        let g_sym = fx.prog.functions[g].sym;

        let fl = fx.sym(".L2", types::LABEL);
        let r = fx.sym("%1", types::INT);
        let b = fx.sym("%2", types::INT);
        let mut entry = BasicBlock::new(fl);
        entry.push(IrInstr::Call {
            result: Some(r),
            callee: g_sym,
            args: vec![],
            callee_func: Some(g),
        });
        entry.push(IrInstr::Binary {
            dst: b,
            op: BinOp::Add,
            lhs: IrValue::Sym(r),
            rhs: IrValue::Int(1),
        });
        entry.push(IrInstr::Ret { value: None });
        fx.func("@f", vec![], vec![entry]);
        allocate(&mut fx.prog);

        assert!(matches!(fx.prog.storage(r), Some(Storage::Reg(Reg::Int(_)))));
    }

    #[test]
    fn float_value_live_across_a_call_is_spilled() {
        let mut fx = Fixture::new();
        let gl = fx.sym(".L1", types::LABEL);
        let mut g_entry = BasicBlock::new(gl);
        g_entry.push(IrInstr::Ret { value: None });
        let g = fx.func("@g", vec![], vec![g_entry]);
        let g_sym = fx.prog.functions[g].sym;

        let fl = fx.sym(".L2", types::LABEL);
        let a = fx.sym("%1", types::FLOAT);
        let b = fx.sym("%2", types::FLOAT);
        let mut entry = BasicBlock::new(fl);
        entry.push(IrInstr::Binary {
            dst: a,
            op: BinOp::Add,
            lhs: IrValue::Float(1.0),
            rhs: IrValue::Float(2.0),
        });
        entry.push(IrInstr::Call {
            result: None,
            callee: g_sym,
            args: vec![],
            callee_func: Some(g),
        });
        entry.push(IrInstr::Binary {
            dst: b,
            op: BinOp::Add,
            lhs: IrValue::Sym(a),
            rhs: IrValue::Float(3.0),
        });
        entry.push(IrInstr::Ret { value: None });
        fx.func("@f", vec![], vec![entry]);
        allocate(&mut fx.prog);

        assert!(matches!(fx.prog.storage(a), Some(Storage::Stack(_))));
        assert!(matches!(
            fx.prog.storage(b),
            Some(Storage::Reg(Reg::Float(_)))
        ));
    }

    #[test]
    fn spilling_across_two_calls_reserves_one_slot() {
        // A value crossing two calls still occupies a single frame slot.
        let mut fx = Fixture::new();
        let gl = fx.sym(".L1", types::LABEL);
        let mut g_entry = BasicBlock::new(gl);
        g_entry.push(IrInstr::Ret { value: None });
        let g = fx.func("@g", vec![], vec![g_entry]);
        let g_sym = fx.prog.functions[g].sym;

        let fl = fx.sym(".L2", types::LABEL);
        let a = fx.sym("%1", types::INT);
        let b = fx.sym("%2", types::INT);
        let mut entry = BasicBlock::new(fl);
        entry.push(IrInstr::Binary {
            dst: a,
            op: BinOp::Add,
            lhs: IrValue::Int(1),
            rhs: IrValue::Int(2),
        });
        entry.push(IrInstr::Call {
            result: None,
            callee: g_sym,
            args: vec![],
            callee_func: Some(g),
        });
        entry.push(IrInstr::Call {
            result: None,
            callee: g_sym,
            args: vec![],
            callee_func: Some(g),
        });
        entry.push(IrInstr::Binary {
            dst: b,
            op: BinOp::Add,
            lhs: IrValue::Sym(a),
            rhs: IrValue::Int(3),
        });
        entry.push(IrInstr::Ret { value: None });
        let f = fx.func("@f", vec![], vec![entry]);
        allocate(&mut fx.prog);

        assert!(matches!(fx.prog.storage(a), Some(Storage::Stack(_))));
        // ra/fp save plus exactly one spill slot.
        assert_eq!(fx.prog.functions[f].frame_size, -12);
    }
}
