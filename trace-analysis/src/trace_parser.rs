//! Trace-line parser: turns `<addr_hex>;<assembly>;<r0>,...,<r15>,<raddr>,
//! <waddr>,` lines into `Instruction` records. Mirrors `parser.cpp`'s
//! `parseTrace`/`parseOperand`, but folds operand parsing into the same
//! pass and reports malformed lines as diagnostics instead of aborting.

use tracesym::instruction::{Instruction, RegSnapshot};
use tracesym::error::Diagnostic;

use crate::grammar::parse_operand;

fn parse_hex_u64(s: &str) -> Result<u64, ()> {
    u64::from_str_radix(s.trim(), 16).map_err(|_| ())
}

/// Parse one non-empty trace line. `id` is the caller-assigned, monotonic
/// instruction id (starting at 1).
fn parse_line(id: u64, line: &str) -> Result<Instruction, Diagnostic> {
    let malformed = || Diagnostic::MalformedTraceLine { line: line.to_string() };

    let mut fields = line.splitn(3, ';');
    let addr_field = fields.next().ok_or_else(malformed)?;
    let asm_field = fields.next().ok_or_else(malformed)?;
    let rest = fields.next().ok_or_else(malformed)?;

    let pc = parse_hex_u64(addr_field).map_err(|_| malformed())?;

    let mut asm_parts = asm_field.splitn(2, ' ');
    let opcode = asm_parts.next().ok_or_else(malformed)?.trim().to_string();
    let operand_text = asm_parts.next().unwrap_or("");

    let mut operands = Vec::new();
    for field in operand_text.split(',') {
        let field = field.trim();
        if field.is_empty() {
            continue;
        }
        match parse_operand(field) {
            Ok(op) => operands.push(op),
            Err(diag) => {
                // Per the parser's failure contract, an unparseable operand
                // yields no operand object; the instruction is still kept,
                // but with fewer operands than its mnemonic would suggest,
                // so the Parameter Builder's arity match will (correctly)
                // treat it as having no dependencies.
                tracing::warn!(%diag, field, "dropping unparseable operand");
            }
        }
    }

    let rest_fields: Vec<&str> = rest.split(',').collect();
    if rest_fields.len() < 18 {
        return Err(malformed());
    }
    let mut regs = [0u64; 16];
    for (i, slot) in regs.iter_mut().enumerate() {
        *slot = parse_hex_u64(rest_fields[i]).map_err(|_| malformed())?;
    }
    let raddr = parse_hex_u64(rest_fields[16]).map_err(|_| malformed())?;
    let waddr = parse_hex_u64(rest_fields[17]).map_err(|_| malformed())?;

    Ok(Instruction::new(id, pc, opcode, operands, RegSnapshot(regs), raddr, waddr))
}

/// Parse a full trace. Empty lines are skipped silently; malformed lines
/// are logged and skipped, consuming no instruction id. Returns the
/// successfully parsed instructions plus every diagnostic encountered.
pub fn parse_trace(text: &str) -> (Vec<Instruction>, Vec<Diagnostic>) {
    let mut instructions = Vec::new();
    let mut diagnostics = Vec::new();
    let mut next_id = 1u64;

    for line in text.lines() {
        if line.is_empty() {
            continue;
        }
        match parse_line(next_id, line) {
            Ok(inst) => {
                instructions.push(inst);
                next_id += 1;
            }
            Err(diag) => {
                tracing::warn!(%diag, "skipping malformed trace line");
                diagnostics.push(diag);
            }
        }
    }
    (instructions, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracesym::operand::OperandKind;
    use tracesym::register::Register;

    fn sample_line(opcode_and_operands: &str) -> String {
        let regs = "0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0";
        format!("400000;{opcode_and_operands};{regs},0,0,")
    }

    #[test]
    fn parses_a_well_formed_line() {
        let line = sample_line("mov rax, 0x1");
        let (insts, diags) = parse_trace(&line);
        assert!(diags.is_empty());
        assert_eq!(insts.len(), 1);
        let inst = &insts[0];
        assert_eq!(inst.id, 1);
        assert_eq!(inst.pc, 0x400000);
        assert_eq!(inst.opcode, "mov");
        assert_eq!(inst.operands.len(), 2);
        assert!(matches!(inst.operands[0].kind, OperandKind::Reg(Register::Rax)));
        assert!(matches!(inst.operands[1].kind, OperandKind::Imm(1)));
    }

    #[test]
    fn assigns_monotonic_ids_skipping_blank_lines() {
        let text = format!(
            "{}\n\n{}\n",
            sample_line("mov rax, 0x1"),
            sample_line("mov rbx, 0x2")
        );
        let (insts, _) = parse_trace(&text);
        assert_eq!(insts.len(), 2);
        assert_eq!(insts[0].id, 1);
        assert_eq!(insts[1].id, 2);
    }

    #[test]
    fn malformed_line_is_skipped_and_does_not_consume_an_id() {
        let good = sample_line("mov rax, 0x1");
        let text = format!("not a trace line\n{good}\n");
        let (insts, diags) = parse_trace(&text);
        assert_eq!(diags.len(), 1);
        assert_eq!(insts.len(), 1);
        assert_eq!(insts[0].id, 1);
    }

    #[test]
    fn reads_raddr_and_waddr() {
        let line = "400000;push rax;0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,1000,";
        let (insts, diags) = parse_trace(line);
        assert!(diags.is_empty());
        assert_eq!(insts[0].raddr, 0);
        assert_eq!(insts[0].waddr, 0x1000);
    }

    #[test]
    fn unparseable_operand_is_dropped_not_fatal() {
        let line = sample_line("mov rax, xmm0");
        let (insts, _) = parse_trace(&line);
        assert_eq!(insts.len(), 1);
        assert_eq!(insts[0].operands.len(), 1);
    }
}
