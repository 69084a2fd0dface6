//! 操作码字段提取辅助函数

use super::instr::Reg;

/// 低 3 位寄存器字段 [2:0]
#[inline]
pub fn reg3(raw: u8) -> Reg {
    raw & 0x7
}

/// 目的寄存器字段 [5:3]（MOV）
#[inline]
pub fn dst3(raw: u8) -> Reg {
    (raw >> 3) & 0x7
}

/// 2-bit 寄存器字段 [3:2]
#[inline]
pub fn hi2(raw: u8) -> u8 {
    (raw >> 2) & 0x3
}

/// 2-bit 寄存器字段 [1:0]
#[inline]
pub fn lo2(raw: u8) -> u8 {
    raw & 0x3
}

/// 把分支偏移字节解释为有符号数
#[inline]
pub fn rel8(next: u8) -> i8 {
    next as i8
}
