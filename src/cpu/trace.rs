//! 执行轨迹
//!
//! 每执行一步追加一条记录，仅供诊断，执行引擎自身从不读取。
//! 设置上限后只保留最近的记录，定时驱动器长时间运行不停机的程序时内存不会无限增长。

use serde::{Deserialize, Serialize};

use super::status::RegisterSnapshot;

/// 单步记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// 执行前的 PC
    pub pc: u8,
    /// 指令字节（1 或 2 个）
    pub bytes: Vec<u8>,
    /// 反汇编文本，未知操作码为 `Unknown (0x..)`
    pub text: String,
    /// 执行后的寄存器快照
    pub registers: RegisterSnapshot,
}

impl std::fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02X}:", self.pc)?;
        for b in &self.bytes {
            write!(f, " {b:02X}")?;
        }
        if self.bytes.len() == 1 {
            f.write_str("   ")?;
        }
        write!(f, "  {}", self.text)
    }
}

/// 只追加的轨迹缓冲
#[derive(Debug, Clone, Default)]
pub struct Trace {
    entries: Vec<TraceEntry>,
    enabled: bool,
    /// 最多保留的条数，`None` 表示不限
    limit: Option<usize>,
}

impl Trace {
    pub fn new(enabled: bool) -> Self {
        Self {
            entries: Vec::new(),
            enabled,
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn push(&mut self, entry: TraceEntry) {
        if !self.enabled || self.limit == Some(0) {
            return;
        }
        if let Some(limit) = self.limit {
            if self.entries.len() >= limit {
                let excess = self.entries.len() + 1 - limit;
                self.entries.drain(..excess);
            }
        }
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&TraceEntry> {
        self.entries.last()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::CpuCore;
    use crate::isa::IsaKind;

    fn entry(pc: u8) -> TraceEntry {
        TraceEntry {
            pc,
            bytes: vec![0x00],
            text: "HALT".into(),
            registers: CpuCore::new(IsaKind::Cdc8512.definition()).snapshot(),
        }
    }

    #[test]
    fn test_limit_keeps_latest_entries() {
        let mut trace = Trace::new(true).with_limit(Some(3));
        for pc in 0..10 {
            trace.push(entry(pc));
        }
        let pcs: Vec<u8> = trace.entries().iter().map(|e| e.pc).collect();
        assert_eq!(pcs, vec![7, 8, 9], "只保留最近 3 条");
    }

    #[test]
    fn test_unlimited_and_disabled() {
        let mut unlimited = Trace::new(true);
        let mut disabled = Trace::new(false).with_limit(Some(3));
        for pc in 0..10 {
            unlimited.push(entry(pc));
            disabled.push(entry(pc));
        }
        assert_eq!(unlimited.entries().len(), 10);
        assert!(disabled.entries().is_empty());
    }
}
