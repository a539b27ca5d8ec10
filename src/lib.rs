//! Symbolic execution core for x86-64 execution traces.
//!
//! Builds a shared value DAG over a linear instruction trace: an aliased,
//! bit-granular register file; a byte-granular symbolic memory; and the
//! executor that drives both from a fixed integer-ALU/move/stack opcode
//! subset. See `executor::Engine` for the entry point.

pub mod error;
pub mod executor;
pub mod export;
pub mod inspect;
pub mod instruction;
pub mod memstore;
pub mod operand;
pub mod parameter;
pub mod register;
pub mod regfile;
pub mod value;

#[cfg(test)]
mod test;
