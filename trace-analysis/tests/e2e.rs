//! End-to-end pipeline tests: trace text in, sliced instructions out.

use trace_analysis::{backward_slice, build_parameters, parse_trace};

fn line(pc: &str, asm: &str, raddr: &str, waddr: &str) -> String {
    format!("{pc};{asm};0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,{raddr},{waddr},")
}

#[test]
fn e5_slice_keeps_every_live_instruction() {
    let trace = [
        line("400000", "mov rax, 0x1", "0", "0"),
        line("400003", "mov rbx, 0x2", "0", "0"),
        line("400006", "add rax, rbx", "0", "0"),
    ]
    .join("\n");

    let (mut instructions, diags) = parse_trace(&trace);
    assert!(diags.is_empty());
    let build_diags = build_parameters(&mut instructions);
    assert!(build_diags.is_empty());

    let slice = backward_slice(&instructions).unwrap();
    assert_eq!(slice.instructions.len(), 3);
    assert!(slice.residual.is_empty());
}

#[test]
fn e6_slice_drops_the_dead_assignment() {
    let trace = [
        line("400000", "mov rax, 0x1", "0", "0"),
        line("400003", "mov rcx, 0x5", "0", "0"),
        line("400006", "mov rbx, 0x2", "0", "0"),
        line("400009", "add rax, rbx", "0", "0"),
    ]
    .join("\n");

    let (mut instructions, diags) = parse_trace(&trace);
    assert!(diags.is_empty());
    build_parameters(&mut instructions);

    let slice = backward_slice(&instructions).unwrap();
    let opcodes_and_pcs: Vec<(u64, &str)> =
        slice.instructions.iter().map(|i| (i.pc, i.opcode.as_str())).collect();
    assert_eq!(
        opcodes_and_pcs,
        vec![(0x400000, "mov"), (0x400006, "mov"), (0x400009, "add")]
    );
}

#[test]
fn push_pop_round_trip_is_sliceable() {
    let trace = [
        line("400000", "push rax", "0", "1000"),
        line("400001", "pop rbx", "1000", "0"),
    ]
    .join("\n");

    let (mut instructions, diags) = parse_trace(&trace);
    assert!(diags.is_empty());
    build_parameters(&mut instructions);

    let slice = backward_slice(&instructions).unwrap();
    assert_eq!(slice.instructions.len(), 2);
    // rbx came from the stack slot at 0x1000, which came from rax.
    assert!(!slice.residual.is_empty());
}
