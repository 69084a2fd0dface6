use super::super::CpuCore;
use super::super::fault::RuntimeError;
use super::Flow;
use super::mem::read_source;
use crate::isa::{Reg, Source};
use crate::memory::Memory;

/// `dst += src`, carry out on unsigned overflow. Carry in is not consumed.
pub fn add(
    cpu: &mut CpuCore,
    dmem: &mut dyn Memory,
    dst: Reg,
    src: Source,
    pc: u8,
) -> Result<Flow, RuntimeError> {
    let a = cpu.read_reg(dst);
    let b = read_source(cpu, dmem, src);
    let (sum, carry) = a.overflowing_add(b);
    cpu.flags_mut().set_carry(carry);
    cpu.write_register(dmem, dst, sum, pc)?;
    Ok(Flow::Next)
}

/// `dst -= src`, carry = no borrow.
pub fn sub(
    cpu: &mut CpuCore,
    dmem: &mut dyn Memory,
    dst: Reg,
    src: Source,
    pc: u8,
) -> Result<Flow, RuntimeError> {
    let a = cpu.read_reg(dst);
    let b = read_source(cpu, dmem, src);
    let (diff, borrow) = a.overflowing_sub(b);
    cpu.flags_mut().set_carry(!borrow);
    cpu.write_register(dmem, dst, diff, pc)?;
    Ok(Flow::Next)
}

pub fn inc(cpu: &mut CpuCore, dmem: &mut dyn Memory, reg: Reg, pc: u8) -> Result<Flow, RuntimeError> {
    let value = cpu.read_reg(reg).wrapping_add(1);
    cpu.write_register(dmem, reg, value, pc)?;
    Ok(Flow::Next)
}

pub fn dec(cpu: &mut CpuCore, dmem: &mut dyn Memory, reg: Reg, pc: u8) -> Result<Flow, RuntimeError> {
    let value = cpu.read_reg(reg).wrapping_sub(1);
    cpu.write_register(dmem, reg, value, pc)?;
    Ok(Flow::Next)
}

pub fn compare(
    cpu: &mut CpuCore,
    dmem: &mut dyn Memory,
    reg: Reg,
    src: Source,
) -> Result<Flow, RuntimeError> {
    let a = cpu.read_reg(reg);
    let b = read_source(cpu, dmem, src);
    cpu.flags_mut().compare(a, b);
    Ok(Flow::Next)
}
