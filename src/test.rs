//! End-to-end scenarios run directly against the core engine, without
//! going through the trace parser (that lives in `trace-analysis` and has
//! its own test suite). Instructions here are built by hand.

use std::collections::HashMap;

use crate::executor::Engine;
use crate::inspect::{conexec, formula, inputs};
use crate::instruction::{Instruction, RegSnapshot};
use crate::operand::Operand;
use crate::register::Register;

fn snap(rax: u64) -> RegSnapshot {
    let mut regs = [0u64; 16];
    regs[0] = rax;
    RegSnapshot(regs)
}

fn inst(id: u64, opcode: &str, operands: Vec<Operand>, regs: RegSnapshot) -> Instruction {
    Instruction::new(id, 0, opcode.to_string(), operands, regs, 0, 0)
}

#[test]
fn e1_mov_is_algebraic() {
    // [mov rax, 0x1; add rax, 0x2] starting from a symbolic rax.
    let mut engine = Engine::new();
    engine.init_fresh_symbols();

    let instructions = vec![
        inst(1, "mov", vec![Operand::reg(Register::Rax), Operand::imm(1)], snap(0)),
        inst(2, "add", vec![Operand::reg(Register::Rax), Operand::imm(2)], snap(0)),
    ];
    engine.run(&instructions).unwrap();

    let rax = engine.regs.get_parent(Register::Rax).unwrap();
    let text = formula(&engine.graph, rax);
    assert_eq!(text, "(add (mov 0x1) 0x2)");

    let empty = HashMap::new();
    let result = conexec(&engine.graph, rax, &empty).unwrap();
    assert_eq!(result, 3);
}

#[test]
fn e2_mov_eax_then_mov_rbx_rax_keeps_high_half_symbolic() {
    let mut engine = Engine::new();
    engine.init_fresh_symbols();

    let instructions = vec![
        inst(1, "mov", vec![Operand::reg(Register::Eax), Operand::imm(0xffff_ffff)], snap(0)),
        inst(2, "mov", vec![Operand::reg(Register::Rbx), Operand::reg(Register::Rax)], snap(0)),
    ];
    engine.run(&instructions).unwrap();

    let rbx = engine.regs.get_parent(Register::Rbx).unwrap();
    let mut input_map = HashMap::new();
    for sym in inputs(&engine.graph, rbx) {
        input_map.insert(sym, 0u64);
    }
    let value = conexec(&engine.graph, rbx, &input_map).unwrap();
    assert_eq!(value & 0xffff_ffff, 0xffff_ffff);
}

#[test]
fn e3_push_pop_round_trips_through_stack() {
    let mut engine = Engine::new();
    engine.init_fresh_symbols();
    let original_rax = engine.regs.get_parent(Register::Rax).unwrap();

    let mut push = inst(1, "push", vec![Operand::reg(Register::Rax)], snap(0));
    push.waddr = 0x1000;
    let mut pop = inst(2, "pop", vec![Operand::reg(Register::Rbx)], snap(0));
    pop.raddr = 0x1000;

    engine.run(&[push, pop]).unwrap();

    let rbx = engine.regs.get_parent(Register::Rbx).unwrap();
    assert_eq!(rbx, original_rax);
}

#[test]
fn e4_xor_self_is_zero_under_any_assignment() {
    let mut engine = Engine::new();
    engine.init_fresh_symbols();

    let instructions = vec![
        inst(1, "xor", vec![Operand::reg(Register::Rax), Operand::reg(Register::Rax)], snap(0)),
    ];
    engine.run(&instructions).unwrap();

    let rax = engine.regs.get_parent(Register::Rax).unwrap();
    let mut input_map = HashMap::new();
    for sym in inputs(&engine.graph, rax) {
        input_map.insert(sym, 0xdead_beef_u64);
    }
    assert_eq!(conexec(&engine.graph, rax, &input_map).unwrap(), 0);
}

#[test]
fn alias_mask_and_shift_are_consistent() {
    let mut engine = Engine::new();
    engine.init_fresh_symbols();
    let rax_sym = engine.regs.get_parent(Register::Rax).unwrap();

    let eax = engine.regs.read(&mut engine.graph, Register::Eax).unwrap();
    let ax = engine.regs.read(&mut engine.graph, Register::Ax).unwrap();
    let al = engine.regs.read(&mut engine.graph, Register::Al).unwrap();
    let ah = engine.regs.read(&mut engine.graph, Register::Ah).unwrap();

    let mut input_map = HashMap::new();
    input_map.insert(rax_sym, 0x1122_3344_5566_7788u64);

    assert_eq!(conexec(&engine.graph, eax, &input_map).unwrap(), 0x5566_7788);
    assert_eq!(conexec(&engine.graph, ax, &input_map).unwrap(), 0x7788);
    assert_eq!(conexec(&engine.graph, al, &input_map).unwrap(), 0x88);
    assert_eq!(conexec(&engine.graph, ah, &input_map).unwrap(), 0x77);
}

#[test]
fn writing_al_preserves_the_rest_of_rax() {
    let mut engine = Engine::new();
    engine.init_fresh_symbols();
    let rax_sym = engine.regs.get_parent(Register::Rax).unwrap();

    let x = engine.graph.concrete(8, 0xAB);
    engine.regs.write(&mut engine.graph, Register::Al, x).unwrap();
    let new_rax = engine.regs.get_parent(Register::Rax).unwrap();

    let mut input_map = HashMap::new();
    input_map.insert(rax_sym, 0x1122_3344_5566_7700u64);
    let result = conexec(&engine.graph, new_rax, &input_map).unwrap();
    assert_eq!(result, 0x1122_3344_5566_77AB);
}

#[test]
fn inputs_set_matches_reachable_symbols() {
    let mut engine = Engine::new();
    engine.init_fresh_symbols();
    let instructions = vec![
        inst(1, "add", vec![Operand::reg(Register::Rax), Operand::reg(Register::Rbx)], snap(0)),
    ];
    engine.run(&instructions).unwrap();
    let rax = engine.regs.get_parent(Register::Rax).unwrap();
    let symbols = inputs(&engine.graph, rax);
    assert_eq!(symbols.len(), 2);

    let mut too_few = HashMap::new();
    too_few.insert(*symbols.iter().next().unwrap(), 1u64);
    assert!(conexec(&engine.graph, rax, &too_few).is_err());
}

#[test]
fn unknown_opcode_is_fatal() {
    let mut engine = Engine::new();
    engine.init_fresh_symbols();
    let instructions = vec![inst(1, "vmread", vec![], snap(0))];
    assert!(engine.run(&instructions).is_err());
}

