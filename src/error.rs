//! Error taxonomy, split the way `fuel-vm`'s `RuntimeError` is: diagnostics
//! the caller can shrug off and continue past, versus failures that abort
//! the current analysis region.

use thiserror::Error;

/// Non-fatal: logged via `tracing::warn!` by the call site, caller
/// continues with a null/sentinel result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    #[error("malformed trace line: {line:?}")]
    MalformedTraceLine { line: String },

    #[error("unknown register name {name:?}")]
    UnknownRegister { name: String },

    #[error("unknown memory-address tag {tag}")]
    UnknownAddressTag { tag: u8 },

    #[error("unparseable operand {text:?}")]
    UnparseableOperand { text: String },

    #[error("empty operand field")]
    EmptyOperandField,

    #[error("{opcode:?} with {arity} operand(s) does not match any known parameter shape")]
    UnsupportedParameterShape { opcode: String, arity: usize },
}

/// Fatal-to-region: the caller must abort the current analysis.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Fatal {
    #[error("unknown opcode {opcode:?}")]
    UnknownOpcode { opcode: String },

    #[error("partial memory overlap: new range {new:?} overlaps existing range {existing:?} \
              without being subset, superset, or disjoint")]
    PartialMemoryOverlap { new: (u64, u64), existing: (u64, u64) },

    #[error("arity mismatch for {op}: expected {expected} operand(s), got {got}")]
    ArityMismatch { op: String, expected: usize, got: usize },

    #[error("conexec input map does not cover symbol {sym}")]
    MissingInputSymbol { sym: u64 },

    #[error("conexec input map has {extra} symbol(s) not present in the formula")]
    ExtraInputSymbol { extra: usize },

    #[error("division by zero evaluating {op}")]
    DivByZero { op: &'static str },

    #[error("malformed value graph: {0}")]
    MalformedGraph(String),

    #[error("register {register} read before the engine was initialised")]
    UninitializedRegister { register: String },
}
