//! Traversal utilities over the value DAG: formula printing, input-symbol
//! collection, and concrete evaluation.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use crate::error::Fatal;
use crate::value::{Op, ValueGraph, ValueId, ValueKind};

/// Print the Value tree rooted at `root` as a parenthesised prefix form,
/// `(op lhs rhs)`. Leaves print their hex for CONCRETE and `sym<id>` for
/// SYMBOL.
pub fn formula(graph: &ValueGraph, root: ValueId) -> String {
    let v = graph.get(root);
    match &v.producer {
        Some(op) => {
            let operands: Vec<String> = op.operands.iter().map(|&o| formula(graph, o)).collect();
            format!("({} {})", op.op.mnemonic(), operands.join(" "))
        }
        None => match v.kind {
            ValueKind::Symbol => format!("sym{}", v.id.0),
            ValueKind::Concrete => match &v.literal {
                Some(lit) => format!("0x{}", lit.hex),
                None => format!("0x{:x}", 0u64), // unreachable for well-formed leaves
            },
            ValueKind::Hybrid => {
                let pieces = v.pieces.as_ref().expect("hybrid leaf must carry pieces");
                let parts: Vec<String> = pieces
                    .iter()
                    .map(|p| format!("[{}:{}]{}", p.lo, p.hi, formula(graph, p.value)))
                    .collect();
                format!("(hybrid {})", parts.join(" "))
            }
        },
    }
}

/// Breadth-first traversal collecting every SYMBOL leaf reachable from
/// `root`. A visited-set keyed on `ValueId` guarantees termination
/// regardless of sharing (and ids are monotonic, so the DAG is acyclic by
/// construction).
pub fn inputs(graph: &ValueGraph, root: ValueId) -> BTreeSet<ValueId> {
    let mut seen = HashSet::new();
    let mut out = BTreeSet::new();
    let mut queue = VecDeque::new();
    queue.push_back(root);
    seen.insert(root);
    while let Some(id) = queue.pop_front() {
        let v = graph.get(id);
        match &v.producer {
            Some(op) => {
                for &child in &op.operands {
                    if seen.insert(child) {
                        queue.push_back(child);
                    }
                }
            }
            None => match v.kind {
                ValueKind::Symbol => {
                    out.insert(id);
                }
                ValueKind::Hybrid => {
                    let pieces = v.pieces.as_ref().expect("hybrid leaf must carry pieces");
                    for p in pieces {
                        if seen.insert(p.value) {
                            queue.push_back(p.value);
                        }
                    }
                }
                ValueKind::Concrete => {}
            },
        }
    }
    out
}

/// Evaluate `root` given a complete assignment from every SYMBOL leaf in
/// `inputs(root)` to a 64-bit value. Unsigned 64-bit C-style semantics:
/// add/sub wrap, imul keeps the low 64 bits, shr is logical, sar is
/// arithmetic, neg is `~x+1`, div/mod fail loudly on a zero divisor.
pub fn conexec(graph: &ValueGraph, root: ValueId, input_map: &HashMap<ValueId, u64>) -> Result<u64, Fatal> {
    let required = inputs(graph, root);
    let provided: BTreeSet<ValueId> = input_map.keys().copied().collect();
    if let Some(&missing) = required.difference(&provided).next() {
        return Err(Fatal::MissingInputSymbol { sym: missing.0 as u64 });
    }
    let extra = provided.difference(&required).count();
    if extra > 0 {
        return Err(Fatal::ExtraInputSymbol { extra });
    }
    let mut cache = HashMap::new();
    eval(graph, root, input_map, &mut cache)
}

fn eval(
    graph: &ValueGraph,
    id: ValueId,
    input_map: &HashMap<ValueId, u64>,
    cache: &mut HashMap<ValueId, u64>,
) -> Result<u64, Fatal> {
    if let Some(&v) = cache.get(&id) {
        return Ok(v);
    }
    let node = graph.get(id);
    let result = match &node.producer {
        Some(op) => {
            let mut ops = Vec::with_capacity(op.operands.len());
            for &o in &op.operands {
                ops.push(eval(graph, o, input_map, cache)?);
            }
            eval_op(op.op, &ops)?
        }
        None => match node.kind {
            ValueKind::Symbol => *input_map.get(&id).ok_or(Fatal::MissingInputSymbol { sym: id.0 as u64 })?,
            ValueKind::Concrete => node.literal.as_ref().map(|l| l.bits).unwrap_or(0),
            ValueKind::Hybrid => {
                let pieces = node.pieces.as_ref().expect("hybrid leaf must carry pieces");
                let mut acc = 0u64;
                for p in pieces {
                    let piece_val = eval(graph, p.value, input_map, cache)?;
                    if p.lo < 64 {
                        acc |= piece_val.wrapping_shl(p.lo);
                    }
                }
                acc
            }
        },
    };
    cache.insert(id, result);
    Ok(result)
}

fn eval_op(op: Op, ops: &[u64]) -> Result<u64, Fatal> {
    Ok(match op {
        Op::Add => ops[0].wrapping_add(ops[1]),
        Op::Sub => ops[0].wrapping_sub(ops[1]),
        Op::Imul => ops[0].wrapping_mul(ops[1]),
        Op::And => ops[0] & ops[1],
        Op::Or => ops[0] | ops[1],
        Op::Xor => ops[0] ^ ops[1],
        Op::Shl => ops[0].wrapping_shl((ops[1] & 63) as u32),
        Op::Shr => ops[0].wrapping_shr((ops[1] & 63) as u32),
        Op::Sar => ((ops[0] as i64) >> (ops[1] & 63)) as u64,
        Op::Neg => (!ops[0]).wrapping_add(1),
        Op::Not => !ops[0],
        Op::Inc => ops[0].wrapping_add(1),
        Op::Dec => ops[0].wrapping_sub(1),
        Op::Bswap => ops[0].swap_bytes(),
        Op::Mov => ops[0],
        Op::Div => {
            if ops[1] == 0 {
                return Err(Fatal::DivByZero { op: "div" });
            }
            ops[0] / ops[1]
        }
        Op::Mod => {
            if ops[1] == 0 {
                return Err(Fatal::DivByZero { op: "mod" });
            }
            ops[0] % ops[1]
        }
    })
}
