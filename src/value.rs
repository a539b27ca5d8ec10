//! The shared value DAG: `Value` nodes (SYMBOL/CONCRETE/HYBRID) produced by
//! `Operation`s, held in an arena indexed by monotonic integer id.
//!
//! Re-architected per the redesign notes away from the source's raw-pointer,
//! never-freed `Value*`/`Operation*` graph: every reference here is a
//! `ValueId`, an index into `ValueGraph`'s backing `Vec`, so equality-by-id
//! is stable and traversals can key a visited-set on a plain integer.

use crate::error::Fatal;

/// Index into a `ValueGraph`. Monotonically increasing as nodes are
/// allocated; doubles as the `<id>` in `sym<id>` formula output.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ValueId(pub u32);

/// The closed set of algebraic operators. `Div`/`Mod` are not produced by
/// the symbolic executor (no opcode in the fixed subset needs them) but are
/// real variants so `conexec` and `emit_cvc` have evaluator/emitter support
/// ready for a value graph built by hand.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Op {
    Add, Sub, Imul, And, Or, Xor, Shl, Shr, Sar,
    Neg, Not, Inc, Dec, Bswap, Mov,
    Div, Mod,
}

impl Op {
    /// Number of Value operands this operator takes.
    pub fn arity(self) -> usize {
        use Op::*;
        match self {
            Neg | Not | Inc | Dec | Bswap | Mov => 1,
            Add | Sub | Imul | And | Or | Xor | Shl | Shr | Sar | Div | Mod => 2,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        use Op::*;
        match self {
            Add => "add", Sub => "sub", Imul => "imul", And => "and", Or => "or",
            Xor => "xor", Shl => "shl", Shr => "shr", Sar => "sar", Neg => "neg",
            Not => "not", Inc => "inc", Dec => "dec", Bswap => "bswap", Mov => "mov",
            Div => "div", Mod => "mod",
        }
    }
}

/// An operator applied to 1-3 Value operands, the producer of a non-leaf
/// Value.
#[derive(Clone, Debug)]
pub struct Operation {
    pub op: Op,
    pub operands: Vec<ValueId>,
}

/// What a leaf Value's literal payload looks like: the textual hex form
/// and the 64-bit bit-vector it is required to match.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConcreteLit {
    pub hex: String,
    pub bits: u64,
}

impl ConcreteLit {
    pub fn new(bits: u64) -> Self {
        ConcreteLit { hex: format!("{:x}", bits), bits }
    }
}

/// The three-way type tag. Mirrors the source's `ValueTy` enum exactly,
/// re-expressed as a closed Rust enum instead of an `int`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ValueKind {
    Symbol,
    Concrete,
    Hybrid,
}

/// One piece of a HYBRID composition: the inclusive bit range within the
/// parent's width that `value` covers.
#[derive(Clone, Debug)]
pub struct HybridPiece {
    pub lo: u32,
    pub hi: u32,
    pub value: ValueId,
}

#[derive(Clone, Debug)]
pub struct Value {
    pub id: ValueId,
    pub width: u32,
    pub kind: ValueKind,
    pub producer: Option<Operation>,
    /// Populated only for genuine CONCRETE leaves (immediates, masks).
    /// An Operation whose operands happen to all be CONCRETE still gets
    /// `kind == Concrete` per type propagation but carries no literal here —
    /// the algebra is non-reducing, so nothing computed its value yet; only
    /// `conexec` does that, given an explicit input assignment.
    pub literal: Option<ConcreteLit>,
    /// Populated only for HYBRID values.
    pub pieces: Option<Vec<HybridPiece>>,
}

impl Value {
    pub fn is_leaf(&self) -> bool {
        self.producer.is_none()
    }
}

/// Arena owning every Value ever allocated during an analysis. Nodes are
/// appended, never mutated after creation, never reclaimed — the DAG only
/// grows for the lifetime of the engine.
#[derive(Default)]
pub struct ValueGraph {
    values: Vec<Value>,
}

impl ValueGraph {
    pub fn new() -> Self {
        ValueGraph { values: Vec::new() }
    }

    pub fn get(&self, id: ValueId) -> &Value {
        &self.values[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn next_id(&self) -> ValueId {
        ValueId(self.values.len() as u32)
    }

    /// Allocate a fresh SYMBOL leaf of the given width.
    pub fn symbol(&mut self, width: u32) -> ValueId {
        let id = self.next_id();
        self.values.push(Value {
            id,
            width,
            kind: ValueKind::Symbol,
            producer: None,
            literal: None,
            pieces: None,
        });
        id
    }

    /// Allocate a fresh CONCRETE leaf carrying the given 64-bit value,
    /// truncated to `width` bits for masking purposes but stored in full.
    pub fn concrete(&mut self, width: u32, bits: u64) -> ValueId {
        let id = self.next_id();
        self.values.push(Value {
            id,
            width,
            kind: ValueKind::Concrete,
            producer: None,
            literal: Some(ConcreteLit::new(bits)),
            pieces: None,
        });
        id
    }

    /// Allocate a CONCRETE leaf wider than 64 bits. Only the memory
    /// store's subset/superset mask construction for multi-qword ranges
    /// needs this; the 64-bit `bits` field holds the low word and `hex`
    /// carries the full-width value for display.
    pub fn concrete_wide(&mut self, width: u32, value: u128) -> ValueId {
        let id = self.next_id();
        self.values.push(Value {
            id,
            width,
            kind: ValueKind::Concrete,
            producer: None,
            literal: Some(ConcreteLit { hex: format!("{:x}", value), bits: value as u64 }),
            pieces: None,
        });
        id
    }

    /// Allocate a HYBRID value from pairwise-disjoint, fully-covering
    /// pieces. Fatal if the pieces violate that invariant — this is an
    /// internal graph-construction contract, not a caller input error.
    pub fn hybrid(&mut self, width: u32, mut pieces: Vec<HybridPiece>) -> Result<ValueId, Fatal> {
        pieces.sort_by_key(|p| p.lo);
        let mut cursor = 0u32;
        for p in &pieces {
            if p.lo != cursor {
                return Err(Fatal::MalformedGraph(format!(
                    "hybrid pieces not contiguous: expected next bit {}, got {}", cursor, p.lo
                )));
            }
            if p.hi < p.lo {
                return Err(Fatal::MalformedGraph("hybrid piece has hi < lo".into()));
            }
            cursor = p.hi + 1;
        }
        if cursor != width {
            return Err(Fatal::MalformedGraph(format!(
                "hybrid pieces cover {} bits, expected {}", cursor, width
            )));
        }
        let id = self.next_id();
        self.values.push(Value {
            id,
            width,
            kind: ValueKind::Hybrid,
            producer: None,
            literal: None,
            pieces: Some(pieces),
        });
        Ok(id)
    }

    /// Is this value's constructed kind SYMBOL? (Not a recursive check —
    /// HYBRID values count as non-concrete for the purposes below.)
    fn operand_is_symbolic(&self, id: ValueId) -> bool {
        !matches!(self.get(id).kind, ValueKind::Concrete)
    }

    /// Allocate an Operation-produced Value. Type propagation: any SYMBOL
    /// (or HYBRID) operand makes the result SYMBOL; all-CONCRETE operands
    /// make the result CONCRETE, but — per the non-reducing algebra — no
    /// literal is computed for it here. `conexec` is the only place a
    /// concrete number for such a node is ever materialized.
    /// Like `build_op`, but for internal callers (register-alias and
    /// memory-overlap masking) that construct `operands` themselves and so
    /// know the arity is correct by inspection; skips the arity check that
    /// exists for the executor's opcode-dispatch boundary.
    pub(crate) fn build_op_trusted(&mut self, op: Op, operands: Vec<ValueId>, width: u32) -> ValueId {
        debug_assert_eq!(operands.len(), op.arity());
        let kind = if operands.iter().any(|&o| self.operand_is_symbolic(o)) {
            ValueKind::Symbol
        } else {
            ValueKind::Concrete
        };
        let id = self.next_id();
        self.values.push(Value {
            id,
            width,
            kind,
            producer: Some(Operation { op, operands }),
            literal: None,
            pieces: None,
        });
        id
    }

    pub fn build_op(&mut self, op: Op, operands: Vec<ValueId>, width: u32) -> Result<ValueId, Fatal> {
        let expected = op.arity();
        if operands.len() != expected {
            return Err(Fatal::ArityMismatch {
                op: op.mnemonic().to_string(),
                expected,
                got: operands.len(),
            });
        }
        let kind = if operands.iter().any(|&o| self.operand_is_symbolic(o)) {
            ValueKind::Symbol
        } else {
            ValueKind::Concrete
        };
        let id = self.next_id();
        self.values.push(Value {
            id,
            width,
            kind,
            producer: Some(Operation { op, operands }),
            literal: None,
            pieces: None,
        });
        Ok(id)
    }
}
