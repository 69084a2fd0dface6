//! Execution units split by operation category.
//!
//! Every unit returns the control-flow decision for the step loop; a
//! `RuntimeError` turns into `Flow::Fault`.

pub mod alu;
pub mod flow;
pub mod mem;

use super::CpuCore;
use super::fault::RuntimeError;
use crate::isa::{DecodedOp, Op};
use crate::memory::Memory;

/// What the step loop does with the PC after an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Advance by the instruction size.
    Next,
    /// PC was set directly.
    Jump(u8),
    Halt,
    Fault(RuntimeError),
}

/// Execute one decoded operation at `pc`.
pub fn execute(cpu: &mut CpuCore, dmem: &mut dyn Memory, decoded: &DecodedOp, pc: u8) -> Flow {
    let result = match decoded.op {
        Op::Halt => Ok(Flow::Halt),
        Op::Nop => Ok(Flow::Next),
        Op::Unknown => Err(RuntimeError::InvalidOpcode {
            pc,
            opcode: decoded.raw,
        }),
        Op::Load { dst, src } => mem::load(cpu, dmem, dst, src, pc),
        Op::Store { src, addr, index } => mem::store(cpu, dmem, src, addr, index),
        Op::Transfer { dst, src } => mem::transfer(cpu, dmem, dst, src, pc),
        Op::Clear { reg } => mem::clear(cpu, dmem, reg, pc),
        Op::Add { dst, src } => alu::add(cpu, dmem, dst, src, pc),
        Op::Sub { dst, src } => alu::sub(cpu, dmem, dst, src, pc),
        Op::Inc { reg } => alu::inc(cpu, dmem, reg, pc),
        Op::Dec { reg } => alu::dec(cpu, dmem, reg, pc),
        Op::Compare { reg, src } => alu::compare(cpu, dmem, reg, src),
        Op::Jump { cond, target } => Ok(flow::jump(cpu, cond, target)),
        Op::Branch { cond, offset } => Ok(flow::branch(cpu, cond, offset, pc, decoded.size)),
    };
    result.unwrap_or_else(Flow::Fault)
}
