use super::super::CpuCore;
use super::super::fault::RuntimeError;
use super::Flow;
use crate::isa::{Reg, RegRole, Source};
use crate::memory::Memory;

/// Effective data address, index added modulo 256.
#[inline]
pub fn effective_address(cpu: &CpuCore, addr: u8, index: Option<Reg>) -> u8 {
    addr.wrapping_add(index.map_or(0, |r| cpu.read_reg(r)))
}

pub fn read_source(cpu: &CpuCore, dmem: &dyn Memory, src: Source) -> u8 {
    match src {
        Source::Imm(v) => v,
        Source::Reg(r) => cpu.read_reg(r),
        Source::Mem { addr, index } => dmem.load8(effective_address(cpu, addr, index)),
    }
}

/// Post-write hook keyed by register role.
///
/// Load registers pull `mem[value]` into their paired data register, store
/// registers push the paired data register to `mem[value]`.
pub fn implicit_access(cpu: &mut CpuCore, dmem: &mut dyn Memory, reg: Reg) {
    let addr = cpu.read_reg(reg);
    match cpu.isa().layout().role(reg) {
        RegRole::Data => {}
        RegRole::Load(data) => {
            let value = dmem.load8(addr);
            cpu.set_reg(data, value);
        }
        RegRole::Store(data) => dmem.store8(addr, cpu.read_reg(data)),
    }
}

pub fn load(
    cpu: &mut CpuCore,
    dmem: &mut dyn Memory,
    dst: Reg,
    src: Source,
    pc: u8,
) -> Result<Flow, RuntimeError> {
    let value = read_source(cpu, dmem, src);
    cpu.write_register(dmem, dst, value, pc)?;
    Ok(Flow::Next)
}

pub fn store(
    cpu: &mut CpuCore,
    dmem: &mut dyn Memory,
    src: Reg,
    addr: u8,
    index: Option<Reg>,
) -> Result<Flow, RuntimeError> {
    let ea = effective_address(cpu, addr, index);
    dmem.store8(ea, cpu.read_reg(src));
    Ok(Flow::Next)
}

pub fn transfer(
    cpu: &mut CpuCore,
    dmem: &mut dyn Memory,
    dst: Reg,
    src: Reg,
    pc: u8,
) -> Result<Flow, RuntimeError> {
    let value = cpu.read_reg(src);
    cpu.write_register(dmem, dst, value, pc)?;
    Ok(Flow::Next)
}

pub fn clear(cpu: &mut CpuCore, dmem: &mut dyn Memory, reg: Reg, pc: u8) -> Result<Flow, RuntimeError> {
    cpu.write_register(dmem, reg, 0, pc)?;
    Ok(Flow::Next)
}
