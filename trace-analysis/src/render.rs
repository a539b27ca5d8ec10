//! Renders `Instruction`s back to the external trace-line grammar of
//! `6. EXTERNAL INTERFACES` (spec.md). The core `Instruction` record keeps
//! only the parsed opcode/operands, not the original disassembly text, so
//! the slicer's output is re-synthesised from the structured operands
//! rather than carried through verbatim — it is round-trippable (valid
//! input to `parse_trace` again), not necessarily byte-identical to the
//! source trace's own formatting.

use tracesym::instruction::Instruction;
use tracesym::operand::{AddrForm, Operand, OperandKind};

fn width_prefix(width: u32) -> &'static str {
    match width {
        8 => "byte",
        16 => "word",
        32 => "dword",
        _ => "qword",
    }
}

fn render_addr_expr(form: &AddrForm) -> String {
    match *form {
        AddrForm::Constant(a) => format!("0x{:x}", a),
        AddrForm::Reg(r) => r.name().to_string(),
        AddrForm::RegScale(r, s) => format!("{}*{}", r.name(), s),
        AddrForm::RegDisp(r, d) => render_signed(r.name(), d),
        AddrForm::RegRegScale(b, i, s) => format!("{}+{}*{}", b.name(), i.name(), s),
        AddrForm::RegScaleDisp(r, s, d) => render_signed(&format!("{}*{}", r.name(), s), d),
        AddrForm::RegRegScaleDisp(b, i, s, d) => {
            render_signed(&format!("{}+{}*{}", b.name(), i.name(), s), d)
        }
    }
}

fn render_signed(prefix: &str, disp: i64) -> String {
    if disp < 0 {
        format!("{}-0x{:x}", prefix, -disp)
    } else {
        format!("{}+0x{:x}", prefix, disp)
    }
}

fn render_operand(op: &Operand) -> String {
    match op.kind {
        OperandKind::Imm(v) => format!("0x{:x}", v),
        OperandKind::Reg(r) => r.name().to_string(),
        OperandKind::Mem(ref form) => {
            format!("{} ptr [{}]", width_prefix(op.width), render_addr_expr(form))
        }
    }
}

/// The `<opcode> <operands>` text this instruction's operands would
/// disassemble to.
pub fn render_assembly(inst: &Instruction) -> String {
    if inst.operands.is_empty() {
        return inst.opcode.clone();
    }
    let operands: Vec<String> = inst.operands.iter().map(render_operand).collect();
    format!("{} {}", inst.opcode, operands.join(", "))
}

/// One `slice.human.trace` line: `<ip_hex> <assembly>  \t(<raddr>,<waddr>)`.
pub fn render_human_line(inst: &Instruction) -> String {
    format!("{:x} {}  \t({:x},{:x})", inst.pc, render_assembly(inst), inst.raddr, inst.waddr)
}

/// One `slice.llse.trace` line, in the same format `parse_trace` accepts.
pub fn render_llse_line(inst: &Instruction) -> String {
    let mut s = format!("{:x};{};", inst.pc, render_assembly(inst));
    for i in 0..16 {
        s.push_str(&format!("{:x},", inst.regs.0[i]));
    }
    s.push_str(&format!("{:x},{:x},", inst.raddr, inst.waddr));
    s
}


#[cfg(test)]
mod trace_analysis_test_support {
    use tracesym::instruction::{Instruction, RegSnapshot};
    use tracesym::operand::Operand;

    pub fn sample_instruction(opcode: &str, operands: Vec<Operand>) -> Instruction {
        Instruction::new(1, 0x400000, opcode.to_string(), operands, RegSnapshot([0; 16]), 0, 0)
    }
}
