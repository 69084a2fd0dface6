//! 运行期错误与状态码

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::isa::Reg;

/// 运行期错误，一旦发生即终止执行，只能通过 reset 或重新装载恢复
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum RuntimeError {
    #[error("invalid opcode 0x{opcode:02X} at pc {pc:#04x}")]
    InvalidOpcode { pc: u8, opcode: u8 },

    #[error("address register r{register} out of range ({value}) at pc {pc:#04x}")]
    AddressOutOfRange { pc: u8, register: Reg, value: u8 },
}

impl RuntimeError {
    /// 状态码：非法指令 1，地址越界 3
    pub fn code(&self) -> u8 {
        match self {
            RuntimeError::InvalidOpcode { .. } => 1,
            RuntimeError::AddressOutOfRange { .. } => 3,
        }
    }

    /// 出错指令的地址
    pub fn pc(&self) -> u8 {
        match *self {
            RuntimeError::InvalidOpcode { pc, .. } | RuntimeError::AddressOutOfRange { pc, .. } => pc,
        }
    }
}

/// CPU 执行状态
///
/// 只有 Running -> Halted 和 Running -> Errored 两种转移。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// 正常运行中
    Running,
    /// 执行了 HALT / BRK
    Halted,
    /// 运行期错误
    Errored(RuntimeError),
}

impl CpuState {
    pub fn is_running(&self) -> bool {
        matches!(self, CpuState::Running)
    }

    /// 状态码：运行中与正常停机为 0
    pub fn code(&self) -> u8 {
        match self {
            CpuState::Running | CpuState::Halted => 0,
            CpuState::Errored(e) => e.code(),
        }
    }
}
