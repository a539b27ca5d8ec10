//! The instruction record: what the parser produces and the parameter
//! builder annotates.

use crate::operand::Operand;
use crate::parameter::Parameter;
use crate::register::{Register, PARENT_REGISTERS};

/// Snapshot of the 16 general-purpose 64-bit registers at the point this
/// instruction executed, in `PARENT_REGISTERS` order (rax, rbx, ..., r15).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct RegSnapshot(pub [u64; 16]);

impl RegSnapshot {
    pub fn get(&self, parent: Register) -> u64 {
        match parent.parent_index() {
            Some(idx) => self.0[idx],
            None => 0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Instruction {
    pub id: u64,
    pub pc: u64,
    pub opcode: String,
    pub operands: Vec<Operand>,
    pub regs: RegSnapshot,
    pub raddr: u64,
    pub waddr: u64,

    /// Populated by the Parameter Builder.
    pub src: Vec<Parameter>,
    pub dst: Vec<Parameter>,
    /// `xchg`-style secondary read side.
    pub src2: Vec<Parameter>,
    /// `xchg`-style secondary write side.
    pub dst2: Vec<Parameter>,
}

impl Instruction {
    pub fn new(
        id: u64,
        pc: u64,
        opcode: String,
        operands: Vec<Operand>,
        regs: RegSnapshot,
        raddr: u64,
        waddr: u64,
    ) -> Self {
        Instruction {
            id,
            pc,
            opcode,
            operands,
            regs,
            raddr,
            waddr,
            src: Vec::new(),
            dst: Vec::new(),
            src2: Vec::new(),
            dst2: Vec::new(),
        }
    }

    /// Concrete value of a parent register as stamped on this instruction.
    pub fn reg_value(&self, parent: Register) -> u64 {
        self.regs.get(parent)
    }
}
