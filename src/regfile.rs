//! The aliased register file: 16 parent 64-bit slots, every alias read or
//! written in terms of them via mask/shift operations in the value graph.

use crate::error::{Diagnostic, Fatal};
use crate::register::Register;
use crate::value::{Op, ValueGraph, ValueId};

fn byte_range_mask(lo: u8, hi: u8) -> u64 {
    let num_bits = (hi - lo + 1) as u32 * 8;
    let start = lo as u32 * 8;
    if num_bits >= 64 {
        !0u64
    } else {
        ((1u64 << num_bits) - 1) << start
    }
}

/// Mapping from the 16 parent 64-bit registers to their current Value.
/// Always has all 16 slots present, per the data-model invariant; a slot
/// holds `None` only in the *uninitialised* engine configuration.
pub struct RegisterFile {
    parents: [Option<ValueId>; 16],
}

impl RegisterFile {
    pub fn uninitialised() -> Self {
        RegisterFile { parents: [None; 16] }
    }

    fn slot(&self, parent: Register) -> usize {
        parent.parent_index().expect("parent register must have a parent_index")
    }

    pub fn get_parent(&self, parent: Register) -> Option<ValueId> {
        self.parents[self.slot(parent)]
    }

    pub fn set_parent(&mut self, parent: Register, value: ValueId) {
        let idx = self.slot(parent);
        self.parents[idx] = Some(value);
    }

    fn require(&self, parent: Register) -> Result<ValueId, Fatal> {
        self.get_parent(parent).ok_or_else(|| Fatal::UninitializedRegister {
            register: parent.name().to_string(),
        })
    }

    /// Read `reg` (any alias or parent), masking/shifting from its parent
    /// as needed.
    pub fn read(&self, graph: &mut ValueGraph, reg: Register) -> Result<ValueId, Fatal> {
        if reg.is_parent() {
            return self.require(reg);
        }
        let info = match reg.alias_info() {
            Some(info) => info,
            None => {
                tracing::warn!(register = %reg, "unknown register alias, returning null");
                return Err(Fatal::UninitializedRegister { register: reg.name().to_string() });
            }
        };
        let parent_val = self.require(info.parent)?;
        let (lo, hi) = info.byte_range;
        let mask = byte_range_mask(lo, hi);
        let mask_val = graph.concrete(64, mask);
        let and_width = (hi as u32 + 1) * 8;
        let anded = graph.build_op_trusted(Op::And, vec![parent_val, mask_val], and_width);
        if info.high_shift {
            let shift_val = graph.concrete(8, 8);
            Ok(graph.build_op_trusted(Op::Shr, vec![anded, shift_val], 8))
        } else {
            Ok(anded)
        }
    }

    /// Write `value` (of `value_width` bits) into `reg` (any alias or
    /// parent), masking the parent and OR-ing the shifted new value back
    /// in.
    pub fn write(
        &mut self,
        graph: &mut ValueGraph,
        reg: Register,
        value: ValueId,
    ) -> Result<(), Diagnostic> {
        if reg.is_parent() {
            self.set_parent(reg, value);
            return Ok(());
        }
        let info = match reg.alias_info() {
            Some(info) => info,
            None => return Err(Diagnostic::UnknownRegister { name: reg.name().to_string() }),
        };
        let parent_val = match self.require(info.parent) {
            Ok(v) => v,
            Err(_) => return Err(Diagnostic::UnknownRegister { name: reg.name().to_string() }),
        };
        let (lo, hi) = info.byte_range;
        let mask = byte_range_mask(lo, hi);
        let inv_mask_val = graph.concrete(64, !mask);
        let masked_parent = graph.build_op_trusted(Op::And, vec![parent_val, inv_mask_val], 64);

        let shifted_new = if info.high_shift || lo > 0 {
            let shift_val = graph.concrete(8, (lo as u64) * 8);
            graph.build_op_trusted(Op::Shl, vec![value, shift_val], 64)
        } else {
            value
        };
        let result = graph.build_op_trusted(Op::Or, vec![masked_parent, shifted_new], 64);
        self.set_parent(info.parent, result);
        Ok(())
    }
}
