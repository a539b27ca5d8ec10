//! CVC bit-vector formula export: the formula printer's counterpart for a
//! solver-facing ASCII syntax, plus the equivalence-check templates.

use std::collections::BTreeSet;
use std::io::{self, Write};

use crate::error::Fatal;
use crate::inspect::inputs;
use crate::value::{Op, ValueGraph, ValueId, ValueKind};

/// Render `root` as a CVC bit-vector expression. `postfix` disambiguates
/// two formulas sharing one output file (the source's global `"a"`/`"b"`
/// toggle, here an explicit argument per the redesign note).
pub fn cvc_expr(graph: &ValueGraph, root: ValueId, postfix: &str) -> Result<String, Fatal> {
    let v = graph.get(root);
    if let Some(op) = &v.producer {
        let a = || cvc_expr(graph, op.operands[0], postfix);
        let b = || cvc_expr(graph, op.operands[1], postfix);
        return Ok(match op.op {
            Op::Add => format!("BVPLUS(64, {}, {})", a()?, b()?),
            Op::Sub => format!("BVSUB(64, {}, {})", a()?, b()?),
            Op::Imul => format!("BVMULT(64, {}, {})", a()?, b()?),
            Op::And => format!("BVAND({}, {})", a()?, b()?),
            Op::Or => format!("BVOR({}, {})", a()?, b()?),
            Op::Xor => format!("BVXOR({}, {})", a()?, b()?),
            Op::Shl => format!("BVSHL({}, {})", a()?, b()?),
            Op::Shr => format!("BVLSHR({}, {})", a()?, b()?),
            Op::Sar => format!("BVASHR({}, {})", a()?, b()?),
            Op::Neg => format!("BVNEG({})", a()?),
            Op::Not => format!("BVNOT({})", a()?),
            Op::Inc => format!("BVPLUS(64, {}, 0hex{:016x})", a()?, 1u64),
            Op::Dec => format!("BVSUB(64, {}, 0hex{:016x})", a()?, 1u64),
            Op::Bswap | Op::Div | Op::Mod => {
                return Err(Fatal::MalformedGraph(format!(
                    "{} has no CVC emitter mapping", op.op.mnemonic()
                )))
            }
            // mov is algebraic in the value graph but transparent on export:
            // it carries no distinct CVC operator, so we pass the operand
            // straight through.
            Op::Mov => a()?,
        });
    }
    Ok(match v.kind {
        ValueKind::Symbol => format!("sym{}{}", v.id.0, postfix),
        ValueKind::Concrete => {
            let lit = v.literal.as_ref().ok_or_else(|| {
                Fatal::MalformedGraph("concrete leaf without a literal".into())
            })?;
            format!("0hex{:016x}", lit.bits)
        }
        ValueKind::Hybrid => {
            return Err(Fatal::MalformedGraph("HYBRID values have no CVC emitter mapping".into()))
        }
    })
}

/// Write `root`'s CVC expression declaration to `w`: `formula.cvc`'s
/// content (the bare expression, newline-terminated).
pub fn emit_cvc<W: Write>(graph: &ValueGraph, root: ValueId, postfix: &str, w: &mut W) -> io::Result<()> {
    let expr = cvc_expr(graph, root, postfix)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
    writeln!(w, "{}", expr)
}

/// `emit_equivalence`: declare each symbol pair in `sym_map` as 64-bit
/// bit-vectors (suffixed `a`/`b`), assert them equal, then query `f1 = f2`.
pub fn emit_equivalence<W: Write>(
    graph: &ValueGraph,
    f1: ValueId,
    f2: ValueId,
    sym_map: &[(ValueId, ValueId)],
    w: &mut W,
) -> io::Result<()> {
    for &(s1, s2) in sym_map {
        writeln!(w, "sym{}a : BITVECTOR(64);", s1.0)?;
        writeln!(w, "sym{}b : BITVECTOR(64);", s2.0)?;
        writeln!(w, "ASSERT(sym{}a = sym{}b);", s1.0, s2.0)?;
    }
    let e1 = cvc_expr(graph, f1, "a").map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
    let e2 = cvc_expr(graph, f2, "b").map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
    writeln!(w, "QUERY({} = {});", e1, e2)?;
    writeln!(w, "COUNTEREXAMPLE;")
}

/// One candidate pairing of per-bit inputs between two formulas, as
/// `emit_bit_equivalence`'s `mapping_list` entries.
pub struct BitMapping {
    pub output_bits: Vec<(u32, u32)>,
    pub input_bits: Vec<((ValueId, u32), (ValueId, u32))>,
}

/// `emit_bit_equivalence`: declare 64 single-bit variables per input in
/// `inputs1`/`inputs2`, concatenate them back into the named symbols via
/// `LET`, assert per-bit equalities per each mapping's `input_bits`, then
/// query per-bit equality of the two outputs per `output_bits`.
pub fn emit_bit_equivalence<W: Write>(
    graph: &ValueGraph,
    f1: ValueId,
    f2: ValueId,
    inputs1: &BTreeSet<ValueId>,
    inputs2: &BTreeSet<ValueId>,
    mapping_list: &[BitMapping],
    w: &mut W,
) -> io::Result<()> {
    let declare_bits = |w: &mut W, syms: &BTreeSet<ValueId>, side: &str| -> io::Result<()> {
        for &s in syms {
            for bit in 0..64 {
                writeln!(w, "sym{}{}_{} : BITVECTOR(1);", s.0, side, bit)?;
            }
            let concat: Vec<String> = (0..64).rev().map(|b| format!("sym{}{}_{}", s.0, side, b)).collect();
            writeln!(w, "LET sym{}{} = {} IN", s.0, side, concat.join(" @ "))?;
        }
        Ok(())
    };
    declare_bits(w, inputs1, "a")?;
    declare_bits(w, inputs2, "b")?;

    let e1 = cvc_expr(graph, f1, "a").map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
    let e2 = cvc_expr(graph, f2, "b").map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

    for (n, mapping) in mapping_list.iter().enumerate() {
        writeln!(w, "% candidate mapping {}", n + 1)?;
        for &((s1, b1), (s2, b2)) in &mapping.input_bits {
            writeln!(w, "ASSERT(sym{}a_{} = sym{}b_{});", s1.0, b1, s2.0, b2)?;
        }
        for &(b1, b2) in &mapping.output_bits {
            writeln!(w, "QUERY(({}[{}:{}] = {}[{}:{}]));", e1, b1, b1, e2, b2, b2)?;
        }
    }
    Ok(())
}
