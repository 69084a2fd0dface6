//! CPU 配置器
//!
//! 按 ISA 名称统一配置寄存器布局、标志模型和解码表。
//!
//! # 示例
//!
//! ```
//! use cdc_vm::cpu::CpuBuilder;
//! use cdc_vm::isa::IsaKind;
//!
//! let cpu = CpuBuilder::new(IsaKind::Cdc6504)
//!     .with_entry_pc(0x10)
//!     .with_trace(false)
//!     .build();
//! assert_eq!(cpu.pc(), 0x10);
//! ```

use super::{CpuCore, Trace};
use crate::isa::IsaKind;

/// CPU 构建器
pub struct CpuBuilder {
    isa: IsaKind,
    entry_pc: u8,
    trace: bool,
    trace_limit: Option<usize>,
}

impl CpuBuilder {
    /// 默认入口 0，记录轨迹
    pub fn new(isa: IsaKind) -> Self {
        Self {
            isa,
            entry_pc: 0,
            trace: true,
            trace_limit: None,
        }
    }

    pub fn with_entry_pc(mut self, pc: u8) -> Self {
        self.entry_pc = pc;
        self
    }

    /// 关闭后 `CpuCore::trace` 始终为空
    pub fn with_trace(mut self, enabled: bool) -> Self {
        self.trace = enabled;
        self
    }

    /// 轨迹最多保留的条数
    pub fn with_trace_limit(mut self, limit: Option<usize>) -> Self {
        self.trace_limit = limit;
        self
    }

    pub fn build(self) -> CpuCore {
        let trace = Trace::new(self.trace).with_limit(self.trace_limit);
        CpuCore::with_config(self.isa.definition(), self.entry_pc, trace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::FlagModel;

    #[test]
    fn test_builder_selects_flag_model() {
        let cpu = CpuBuilder::new(IsaKind::Cdc8512).build();
        assert_eq!(cpu.flags().model(), FlagModel::Comparison);
        let cpu = CpuBuilder::new(IsaKind::Cdc6504).build();
        assert_eq!(cpu.flags().model(), FlagModel::StatusBits);
    }

    #[test]
    fn test_builder_without_trace() {
        let mut cpu = CpuBuilder::new(IsaKind::Cdc8512).with_trace(false).build();
        let imem = crate::memory::Bank::new();
        let mut dmem = crate::memory::Bank::new();
        assert!(cpu.step(&imem, &mut dmem).is_some());
        assert!(cpu.trace().is_empty());
    }

    #[test]
    fn test_builder_trace_limit() {
        let mut cpu = CpuBuilder::new(IsaKind::Cdc8512)
            .with_trace_limit(Some(2))
            .build();
        // 全零指令存储体：第一步即 HALT，恢复后继续执行
        let imem = crate::memory::Bank::new();
        let mut dmem = crate::memory::Bank::new();
        for _ in 0..4 {
            cpu.resume();
            cpu.step(&imem, &mut dmem);
        }
        assert_eq!(cpu.trace().len(), 2);
        assert_eq!(cpu.trace()[1].pc, 3);
    }
}
