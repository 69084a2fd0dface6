use super::super::CpuCore;
use super::Flow;
use crate::isa::Condition;

/// Absolute jump.
pub fn jump(cpu: &CpuCore, cond: Condition, target: u8) -> Flow {
    if cpu.flags().test(cond) {
        Flow::Jump(target)
    } else {
        Flow::Next
    }
}

/// Relative branch from the address after the instruction.
pub fn branch(cpu: &CpuCore, cond: Condition, offset: i8, pc: u8, size: u8) -> Flow {
    if cpu.flags().test(cond) {
        Flow::Jump(pc.wrapping_add(size).wrapping_add(offset as u8))
    } else {
        Flow::Next
    }
}
