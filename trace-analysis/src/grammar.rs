//! Operand text grammar: regex-based recognition of memory/register/
//! immediate operand shapes. Mirrors the longest-match regex cascade of
//! the original `parser.cpp`'s `createOperand`/`createAddrOperand`/
//! `createDataOperand`, but resolves register operands through
//! `Register::from_name` rather than re-deriving their bit width from a
//! second family of per-width regexes.

use once_cell::sync::OnceCell;
use regex::Regex;

use tracesym::error::Diagnostic;
use tracesym::operand::{AddrForm, Operand};
use tracesym::register::Register;

const REG: &str = "rax|rbx|rcx|rdx|rsi|rdi|rsp|rbp|r8|r9|r10|r11|r12|r13|r14|r15";

struct Patterns {
    ptr: Regex,
    bare_bracket: Regex,
    reg_reg_scale_disp: Regex,
    reg_scale_disp: Regex,
    reg_reg_scale: Regex,
    reg_disp: Regex,
    reg_scale: Regex,
    reg: Regex,
    imm: Regex,
}

fn patterns() -> &'static Patterns {
    static CELL: OnceCell<Patterns> = OnceCell::new();
    CELL.get_or_init(|| Patterns {
        ptr: Regex::new(r"^(byte|word|dword|qword)\s+ptr\s+\[(.+)\]$").unwrap(),
        bare_bracket: Regex::new(r"^\[(.+)\]$").unwrap(),
        reg_reg_scale_disp: Regex::new(&format!(
            r"^({REG})\+({REG})\*([0-9]+)([+-])(0x[0-9a-f]+)$"
        ))
        .unwrap(),
        reg_scale_disp: Regex::new(&format!(r"^({REG})\*([0-9]+)([+-])(0x[0-9a-f]+)$")).unwrap(),
        reg_reg_scale: Regex::new(&format!(r"^({REG})\+({REG})\*([0-9]+)$")).unwrap(),
        reg_disp: Regex::new(&format!(r"^({REG})([+-])(0x[0-9a-f]+)$")).unwrap(),
        reg_scale: Regex::new(&format!(r"^({REG})\*([0-9]+)$")).unwrap(),
        reg: Regex::new(&format!(r"^({REG})$")).unwrap(),
        imm: Regex::new(r"^0x[0-9a-f]+$").unwrap(),
    })
}

fn parse_hex_u64(s: &str) -> u64 {
    u64::from_str_radix(s.trim_start_matches("0x"), 16).unwrap_or(0)
}

fn signed_disp(sign: &str, magnitude: &str) -> i64 {
    let m = parse_hex_u64(magnitude) as i64;
    if sign == "-" {
        -m
    } else {
        m
    }
}

fn reg(name: &str) -> Result<Register, Diagnostic> {
    Register::from_name(name).ok_or_else(|| Diagnostic::UnknownRegister { name: name.to_string() })
}

/// Match `expr` (the contents of a `[...]` bracket, already stripped)
/// against the seven address forms, longest/most-specific first.
fn parse_addr_expr(expr: &str) -> Result<AddrForm, Diagnostic> {
    let p = patterns();

    if let Some(c) = p.reg_reg_scale_disp.captures(expr) {
        return Ok(AddrForm::RegRegScaleDisp(
            reg(&c[1])?,
            reg(&c[2])?,
            c[3].parse().unwrap_or(1),
            signed_disp(&c[4], &c[5]),
        ));
    }
    if let Some(c) = p.reg_scale_disp.captures(expr) {
        return Ok(AddrForm::RegScaleDisp(
            reg(&c[1])?,
            c[2].parse().unwrap_or(1),
            signed_disp(&c[3], &c[4]),
        ));
    }
    if let Some(c) = p.reg_reg_scale.captures(expr) {
        return Ok(AddrForm::RegRegScale(reg(&c[1])?, reg(&c[2])?, c[3].parse().unwrap_or(1)));
    }
    if let Some(c) = p.reg_disp.captures(expr) {
        return Ok(AddrForm::RegDisp(reg(&c[1])?, signed_disp(&c[2], &c[3])));
    }
    if let Some(c) = p.reg_scale.captures(expr) {
        return Ok(AddrForm::RegScale(reg(&c[1])?, c[2].parse().unwrap_or(1)));
    }
    if let Some(c) = p.reg.captures(expr) {
        return Ok(AddrForm::Reg(reg(&c[1])?));
    }
    if p.imm.is_match(expr) {
        return Ok(AddrForm::Constant(parse_hex_u64(expr)));
    }
    Err(Diagnostic::UnparseableOperand { text: expr.to_string() })
}

fn width_for_prefix(prefix: &str) -> u32 {
    match prefix {
        "byte" => 8,
        "word" => 16,
        "dword" => 32,
        "qword" => 64,
        _ => 64,
    }
}

/// Parse one disassembled operand field (already trimmed of the
/// surrounding whitespace a comma-split leaves behind).
pub fn parse_operand(text: &str) -> Result<Operand, Diagnostic> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Diagnostic::EmptyOperandField);
    }
    let p = patterns();

    if let Some(c) = p.ptr.captures(text) {
        let width = width_for_prefix(&c[1]);
        let form = parse_addr_expr(&c[2])?;
        return Ok(Operand::mem(form, width));
    }
    if let Some(c) = p.bare_bracket.captures(text) {
        let form = parse_addr_expr(&c[1])?;
        return Ok(Operand::mem(form, 64));
    }
    if p.imm.is_match(text) {
        return Ok(Operand::imm(parse_hex_u64(text)));
    }
    if let Some(r) = Register::from_name(text) {
        return Ok(Operand::reg(r));
    }
    Err(Diagnostic::UnparseableOperand { text: text.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracesym::operand::OperandKind;

    #[test]
    fn parses_register_operand_with_correct_width() {
        let op = parse_operand("eax").unwrap();
        assert_eq!(op.width, 32);
        assert!(matches!(op.kind, OperandKind::Reg(Register::Eax)));
    }

    #[test]
    fn parses_immediate() {
        let op = parse_operand("0x2a").unwrap();
        assert!(matches!(op.kind, OperandKind::Imm(0x2a)));
    }

    #[test]
    fn parses_qword_ptr_reg_disp() {
        let op = parse_operand("qword ptr [rbp-0x8]").unwrap();
        assert_eq!(op.width, 64);
        match op.kind {
            OperandKind::Mem(AddrForm::RegDisp(Register::Rbp, -8)) => {}
            other => panic!("unexpected operand: {other:?}"),
        }
    }

    #[test]
    fn parses_byte_ptr_reg_reg_scale() {
        let op = parse_operand("byte ptr [rax+rbx*4]").unwrap();
        assert_eq!(op.width, 8);
        match op.kind {
            OperandKind::Mem(AddrForm::RegRegScale(Register::Rax, Register::Rbx, 4)) => {}
            other => panic!("unexpected operand: {other:?}"),
        }
    }

    #[test]
    fn parses_bare_bracket_as_64_bit_constant() {
        let op = parse_operand("[0x601040]").unwrap();
        assert_eq!(op.width, 64);
        assert!(matches!(op.kind, OperandKind::Mem(AddrForm::Constant(0x601040))));
    }

    #[test]
    fn parses_full_reg_reg_scale_disp() {
        let op = parse_operand("dword ptr [rsi+rdi*2+0x10]").unwrap();
        match op.kind {
            OperandKind::Mem(AddrForm::RegRegScaleDisp(Register::Rsi, Register::Rdi, 2, 0x10)) => {}
            other => panic!("unexpected operand: {other:?}"),
        }
    }

    #[test]
    fn unknown_token_is_a_diagnostic() {
        assert!(parse_operand("xmm0").is_err());
    }
}
