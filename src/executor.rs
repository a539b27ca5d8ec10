//! The symbolic executor: iterates an instruction range, dispatching each
//! opcode to the value algebra and the register file / memory store.

use std::collections::HashMap;

use crate::error::Fatal;
use crate::instruction::Instruction;
use crate::memstore::MemoryStore;
use crate::operand::{AddrForm, Operand, OperandKind};
use crate::regfile::RegisterFile;
use crate::register::{Register, PARENT_REGISTERS};
use crate::value::{Op, ValueGraph, ValueId};

/// The opcode set §4.2/§4.6 admit, grouped by dispatch shape. `Inert`
/// covers jumps, conditional jumps, `ret`, `call`, `test`, `cmp` — recorded
/// but contributing no register/memory side effect beyond the discarded
/// comparison value the supplemented `cmp`/`test` handling below builds
/// purely for trace-level visibility.
enum Dispatch {
    Inert,
    CmpLike(Op),
    Push,
    Pop,
    Unary(Op),
    Binary(Op),
    ImulRegRegImm,
    Xchg,
}

fn dispatch_for(opcode: &str) -> Option<Dispatch> {
    use Dispatch::*;
    Some(match opcode {
        "jmp" | "je" | "jne" | "jz" | "jnz" | "jg" | "jge" | "jl" | "jle" | "ja" | "jae"
        | "jb" | "jbe" | "jc" | "jnc" | "jo" | "jno" | "js" | "jns" | "jp" | "jnp"
        | "ret" | "call" => Inert,
        "test" => CmpLike(Op::And),
        "cmp" => CmpLike(Op::Sub),
        "push" => Push,
        "pop" => Pop,
        "inc" => Unary(Op::Inc),
        "dec" => Unary(Op::Dec),
        "neg" => Unary(Op::Neg),
        "not" => Unary(Op::Not),
        "bswap" => Unary(Op::Bswap),
        "mov" | "movzx" => Binary(Op::Mov),
        "add" => Binary(Op::Add),
        "sub" => Binary(Op::Sub),
        "and" => Binary(Op::And),
        "or" => Binary(Op::Or),
        "xor" => Binary(Op::Xor),
        "shl" => Binary(Op::Shl),
        "shr" => Binary(Op::Shr),
        "imul" => ImulRegRegImm,
        "xchg" => Xchg,
        _ => return None,
    })
}

fn full_reg_value(regs: &crate::instruction::RegSnapshot, r: Register) -> u64 {
    let parent = if r.is_parent() {
        r
    } else {
        r.alias_info().map(|i| i.parent).unwrap_or(r)
    };
    regs.get(parent)
}

fn resolve_addr(form: &AddrForm, regs: &crate::instruction::RegSnapshot) -> u64 {
    match *form {
        AddrForm::Constant(a) => a,
        AddrForm::Reg(r) => full_reg_value(regs, r),
        AddrForm::RegScale(r, scale) => full_reg_value(regs, r).wrapping_mul(scale),
        AddrForm::RegDisp(r, disp) => full_reg_value(regs, r).wrapping_add(disp as u64),
        AddrForm::RegRegScale(b, i, scale) => full_reg_value(regs, b)
            .wrapping_add(full_reg_value(regs, i).wrapping_mul(scale)),
        AddrForm::RegScaleDisp(i, scale, disp) => full_reg_value(regs, i)
            .wrapping_mul(scale)
            .wrapping_add(disp as u64),
        AddrForm::RegRegScaleDisp(b, i, scale, disp) => full_reg_value(regs, b)
            .wrapping_add(full_reg_value(regs, i).wrapping_mul(scale))
            .wrapping_add(disp as u64),
    }
}

/// The symbolic execution engine. Owns the value graph, the register file,
/// the memory store, and the map recording which fresh SYMBOL leaf
/// originated from which register (the memory-side counterpart,
/// `meminput`, lives on `MemoryStore` itself).
pub struct Engine {
    pub graph: ValueGraph,
    pub regs: RegisterFile,
    pub mem: MemoryStore,
    pub reginput: HashMap<ValueId, Register>,
    initialised: bool,
}

impl Engine {
    pub fn new() -> Self {
        Engine {
            graph: ValueGraph::new(),
            regs: RegisterFile::uninitialised(),
            mem: MemoryStore::new(),
            reginput: HashMap::new(),
            initialised: false,
        }
    }

    /// Initialise with a fresh SYMBOL per parent register, recording each
    /// in `reginput`.
    pub fn init_fresh_symbols(&mut self) {
        for &parent in &PARENT_REGISTERS {
            let s = self.graph.symbol(64);
            self.reginput.insert(s, parent);
            self.regs.set_parent(parent, s);
        }
        self.initialised = true;
    }

    /// Initialise with caller-supplied leaves, in `PARENT_REGISTERS` order
    /// (rax, rbx, ..., r15). Useful for chaining a second region's
    /// execution onto the first's output registers.
    pub fn init_explicit(&mut self, leaves: [ValueId; 16]) {
        for (i, &parent) in PARENT_REGISTERS.iter().enumerate() {
            self.regs.set_parent(parent, leaves[i]);
        }
        self.initialised = true;
    }

    /// Run the (possibly sliced) instruction list. Must be called after
    /// one of the `init_*` methods.
    pub fn run(&mut self, instructions: &[Instruction]) -> Result<(), Fatal> {
        if !self.initialised {
            return Err(Fatal::MalformedGraph("engine run before initialisation".into()));
        }
        for inst in instructions {
            self.step(inst)?;
        }
        Ok(())
    }

    fn step(&mut self, inst: &Instruction) -> Result<(), Fatal> {
        let dispatch = match dispatch_for(&inst.opcode) {
            Some(d) => d,
            None => {
                return Err(Fatal::UnknownOpcode { opcode: inst.opcode.clone() });
            }
        };
        match dispatch {
            Dispatch::Inert => Ok(()),
            Dispatch::CmpLike(op) => {
                // Supplemented: still build the sub/and node so step-level
                // tracing can show the comparison executed; the result is
                // never written to a register or memory Parameter.
                if inst.operands.len() == 2 {
                    let a = self.read_operand(&inst.operands[0], inst)?;
                    let b = self.read_operand(&inst.operands[1], inst)?;
                    let width = inst.operands[0].width;
                    let result = self.graph.build_op(op, vec![a, b], width)?;
                    tracing::trace!(id = inst.id, opcode = %inst.opcode, result = result.0, "comparison evaluated, result discarded");
                }
                Ok(())
            }
            Dispatch::Push => self.exec_push(inst),
            Dispatch::Pop => self.exec_pop(inst),
            Dispatch::Unary(op) => self.exec_unary(inst, op),
            Dispatch::Binary(op) => self.exec_binary(inst, op),
            Dispatch::ImulRegRegImm => self.exec_imul3(inst),
            Dispatch::Xchg => self.exec_xchg(inst),
        }
    }

    fn read_operand(&mut self, operand: &Operand, inst: &Instruction) -> Result<ValueId, Fatal> {
        match operand.kind {
            OperandKind::Imm(v) => Ok(self.graph.concrete(operand.width, v)),
            OperandKind::Reg(r) => self.regs.read(&mut self.graph, r),
            OperandKind::Mem(ref form) => {
                let addr = resolve_addr(form, &inst.regs);
                self.mem.read(&mut self.graph, addr, operand.width / 8)
            }
        }
    }

    fn write_operand(&mut self, operand: &Operand, inst: &Instruction, value: ValueId) -> Result<(), Fatal> {
        match operand.kind {
            OperandKind::Imm(_) => Err(Fatal::MalformedGraph("cannot write to an immediate operand".into())),
            OperandKind::Reg(r) => {
                self.regs.write(&mut self.graph, r, value).map_err(|d| {
                    tracing::warn!(%d, "register write diagnostic");
                    Fatal::MalformedGraph(d.to_string())
                })
            }
            OperandKind::Mem(ref form) => {
                let addr = resolve_addr(form, &inst.regs);
                self.mem.write(&mut self.graph, addr, operand.width / 8, value)
            }
        }
    }

    fn exec_unary(&mut self, inst: &Instruction, op: Op) -> Result<(), Fatal> {
        let operand = inst.operands.first().ok_or_else(|| Fatal::ArityMismatch {
            op: inst.opcode.clone(),
            expected: 1,
            got: 0,
        })?;
        let v = self.read_operand(operand, inst)?;
        let result = self.graph.build_op(op, vec![v], operand.width)?;
        self.write_operand(operand, inst, result)
    }

    fn exec_binary(&mut self, inst: &Instruction, op: Op) -> Result<(), Fatal> {
        if inst.operands.len() < 2 {
            return Err(Fatal::ArityMismatch { op: inst.opcode.clone(), expected: 2, got: inst.operands.len() });
        }
        let dst = inst.operands[0];
        let src = inst.operands[1];
        let src_val = self.read_operand(&src, inst)?;
        let result = if op == Op::Mov {
            // Algebraic mov: wraps the source in a Mov Operation node
            // rather than replacing it outright (the choice documented for
            // the E1 scenario).
            self.graph.build_op(Op::Mov, vec![src_val], dst.width)?
        } else {
            let dst_val = self.read_operand(&dst, inst)?;
            self.graph.build_op(op, vec![dst_val, src_val], dst.width)?
        };
        self.write_operand(&dst, inst, result)
    }

    fn exec_imul3(&mut self, inst: &Instruction) -> Result<(), Fatal> {
        if inst.operands.len() != 3 {
            return Err(Fatal::ArityMismatch { op: "imul".into(), expected: 3, got: inst.operands.len() });
        }
        let dst = inst.operands[0];
        let src_reg = inst.operands[1];
        let src_imm = inst.operands[2];
        let a = self.read_operand(&src_reg, inst)?;
        let b = self.read_operand(&src_imm, inst)?;
        let result = self.graph.build_op(Op::Imul, vec![a, b], dst.width)?;
        self.write_operand(&dst, inst, result)
    }

    fn exec_push(&mut self, inst: &Instruction) -> Result<(), Fatal> {
        let src = inst.operands.first().ok_or_else(|| Fatal::ArityMismatch {
            op: "push".into(),
            expected: 1,
            got: 0,
        })?;
        let v = self.read_operand(src, inst)?;
        let width_bytes = src.width / 8;
        self.mem.write(&mut self.graph, inst.waddr, width_bytes, v)
    }

    fn exec_pop(&mut self, inst: &Instruction) -> Result<(), Fatal> {
        let dst = inst.operands.first().ok_or_else(|| Fatal::ArityMismatch {
            op: "pop".into(),
            expected: 1,
            got: 0,
        })?;
        let width_bytes = dst.width / 8;
        let v = self.mem.read(&mut self.graph, inst.raddr, width_bytes)?;
        self.write_operand(dst, inst, v)
    }

    fn exec_xchg(&mut self, inst: &Instruction) -> Result<(), Fatal> {
        if inst.operands.len() != 2 {
            return Err(Fatal::ArityMismatch { op: "xchg".into(), expected: 2, got: inst.operands.len() });
        }
        let a = inst.operands[0];
        let b = inst.operands[1];
        let va = self.read_operand(&a, inst)?;
        let vb = self.read_operand(&b, inst)?;
        self.write_operand(&a, inst, vb)?;
        self.write_operand(&b, inst, va)?;
        Ok(())
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}
