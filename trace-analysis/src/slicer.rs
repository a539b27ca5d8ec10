//! The backward program slicer: given an instruction list with Parameters
//! already built, computes the subsequence of instructions the final
//! instruction's reads transitively depend on.
//!
//! Grounded in `slicer.cpp`'s `backslice`: a working set of live
//! Parameters seeded from the last instruction, walked backward, each
//! live write pulling its non-immediate sources into the set.

use std::collections::BTreeSet;

use tracesym::instruction::Instruction;
use tracesym::parameter::Parameter;

/// Result of a backward slice: the reduced instruction list in original
/// order, plus the residual working set — Parameters the slice still
/// depends on that no earlier instruction in the range produces (the
/// trace's own initial-state inputs).
pub struct Slice {
    pub instructions: Vec<Instruction>,
    pub residual: BTreeSet<Parameter>,
}

/// Slice `instructions` against the read set of its own last element.
/// Returns `None` if `instructions` is empty (no criterion to seed from).
pub fn backward_slice(instructions: &[Instruction]) -> Option<Slice> {
    let (last, rest) = instructions.split_last()?;

    let mut working_set: BTreeSet<Parameter> = last.src.iter().copied().collect();
    let mut sliced: Vec<Instruction> = vec![last.clone()];

    for inst in rest.iter().rev() {
        if inst.opcode == "xchg" {
            // Both destinations are checked against the set as it stood
            // before this instruction; only then are the matching sources
            // pulled in. Checking and extending interleaved would let a
            // dst2 hit that's only true because src2 was just inserted by
            // the dst check (the two sides legitimately share bytes).
            let hit_primary = remove_any(&mut working_set, &inst.dst);
            let hit_secondary = remove_any(&mut working_set, &inst.dst2);
            if hit_primary {
                working_set.extend(inst.src2.iter().copied());
            }
            if hit_secondary {
                working_set.extend(inst.src.iter().copied());
            }
            if hit_primary || hit_secondary {
                sliced.push(inst.clone());
            }
            continue;
        }

        if inst.dst.is_empty() {
            continue;
        }
        if remove_any(&mut working_set, &inst.dst) {
            working_set.extend(inst.src.iter().copied().filter(|p| !matches!(p, Parameter::Imm(_))));
            sliced.push(inst.clone());
        }
    }

    sliced.reverse();
    Some(Slice { instructions: sliced, residual: working_set })
}

/// Remove every Parameter in `write_set` that's present in `working_set`;
/// return whether any removal happened (i.e. this write is live).
fn remove_any(working_set: &mut BTreeSet<Parameter>, write_set: &[Parameter]) -> bool {
    let mut hit = false;
    for p in write_set {
        if working_set.remove(p) {
            hit = true;
        }
    }
    hit
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracesym::instruction::RegSnapshot;
    use tracesym::register::Register;

    fn mk(id: u64, opcode: &str, src: Vec<Parameter>, dst: Vec<Parameter>) -> Instruction {
        let mut i = Instruction::new(id, 0, opcode.to_string(), vec![], RegSnapshot([0; 16]), 0, 0);
        i.src = src;
        i.dst = dst;
        i
    }

    fn rax() -> Vec<Parameter> {
        Parameter::reg_range(Register::Rax, (0, 7))
    }
    fn rbx() -> Vec<Parameter> {
        Parameter::reg_range(Register::Rbx, (0, 7))
    }
    fn rcx() -> Vec<Parameter> {
        Parameter::reg_range(Register::Rcx, (0, 7))
    }

    #[test]
    fn e5_all_three_survive_when_all_are_live() {
        // [mov rax,1; mov rbx,2; add rax,rbx], criterion = final instruction.
        let insts = vec![
            mk(1, "mov", vec![Parameter::Imm(1)], rax()),
            mk(2, "mov", vec![Parameter::Imm(2)], rbx()),
            mk(3, "add", {
                let mut s = rax();
                s.extend(rbx());
                s
            }, rax()),
        ];
        let slice = backward_slice(&insts).unwrap();
        assert_eq!(slice.instructions.len(), 3);
        assert!(slice.residual.is_empty());
    }

    #[test]
    fn e6_dead_instruction_is_dropped() {
        // [mov rax,1; mov rcx,5; mov rbx,2; add rax,rbx] -> rcx write is dead.
        let insts = vec![
            mk(1, "mov", vec![Parameter::Imm(1)], rax()),
            mk(2, "mov", vec![Parameter::Imm(5)], rcx()),
            mk(3, "mov", vec![Parameter::Imm(2)], rbx()),
            mk(4, "add", {
                let mut s = rax();
                s.extend(rbx());
                s
            }, rax()),
        ];
        let slice = backward_slice(&insts).unwrap();
        let ids: Vec<u64> = slice.instructions.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 3, 4]);
    }

    #[test]
    fn xchg_dependency_fires_on_the_live_side_only() {
        // xchg rax,rbx ; final instruction reads only rax.
        let mut xchg = mk(1, "xchg", rax(), rax());
        xchg.src2 = rbx();
        xchg.dst2 = rbx();
        let insts = vec![xchg, mk(2, "mov", rax(), vec![])];

        let slice = backward_slice(&insts).unwrap();
        // the xchg instruction should be pulled in because it writes rax
        // (dst), and its src2 (old rbx) becomes part of the residual.
        let ids: Vec<u64> = slice.instructions.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(slice.residual.iter().any(|p| rbx().contains(p)));
    }

    #[test]
    fn empty_trace_has_no_slice() {
        assert!(backward_slice(&[]).is_none());
    }
}
