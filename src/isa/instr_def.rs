//! 操作码定义结构
//!
//! 统一的操作码定义，同时用于解码和冲突检测

use super::instr::{DecodedOp, Op};

/// 操作码定义
///
/// 一处定义，两处使用：
/// - 解码：通过 mask/match 匹配后调用 decode 函数
/// - 冲突检测：通过 mask/match 判断两条定义是否可能匹配同一字节
#[derive(Clone)]
pub struct OpcodeDef {
    /// 助记符（用于反汇编和冲突报告）
    pub name: &'static str,
    /// 匹配掩码：哪些位需要检查
    pub mask: u8,
    /// 匹配值：这些位应该是什么
    pub match_val: u8,
    /// 指令长度
    pub size: u8,
    /// 解码函数：(操作码, 后随字节) -> Op
    pub decode: fn(u8, u8) -> Op,
}

impl OpcodeDef {
    pub const fn new(
        name: &'static str,
        mask: u8,
        match_val: u8,
        size: u8,
        decode: fn(u8, u8) -> Op,
    ) -> Self {
        Self {
            name,
            mask,
            match_val,
            size,
            decode,
        }
    }

    /// 检查字节是否匹配此定义
    #[inline]
    pub fn matches(&self, raw: u8) -> bool {
        (raw & self.mask) == self.match_val
    }

    #[inline]
    pub fn decode_op(&self, raw: u8, next: u8) -> DecodedOp {
        DecodedOp {
            raw,
            next,
            name: self.name,
            size: self.size,
            op: (self.decode)(raw, next),
        }
    }

    /// 两个定义冲突当且仅当存在某个字节同时匹配两者
    pub fn conflicts_with(&self, other: &OpcodeDef) -> bool {
        let common_mask = self.mask & other.mask;
        (self.match_val & common_mask) == (other.match_val & common_mask)
    }

    /// 掩码中被检查的位数，越大越具体
    pub fn specificity(&self) -> u32 {
        self.mask.count_ones()
    }
}

impl std::fmt::Debug for OpcodeDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpcodeDef")
            .field("name", &self.name)
            .field("mask", &format_args!("0x{:02X}", self.mask))
            .field("match_val", &format_args!("0x{:02X}", self.match_val))
            .field("size", &self.size)
            .finish()
    }
}

// ========== 掩码常量 ==========

/// 精确匹配整个字节
pub const EXACT_MASK: u8 = 0xFF;

/// 高 5 位前缀，低 3 位为寄存器字段
pub const PREFIX5_MASK: u8 = 0xF8;

/// 高 4 位前缀，低 4 位为两个 2-bit 寄存器字段
pub const PREFIX4_MASK: u8 = 0xF0;

/// 高 2 位前缀，低 6 位为两个 3-bit 寄存器字段
pub const PREFIX2_MASK: u8 = 0xC0;

// ========== 表驱动解码器 ==========

/// 被遮蔽的规则：`later` 能匹配的字节里至少有一个会先被 `earlier` 截走
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shadowing {
    pub earlier: &'static str,
    pub later: &'static str,
}

/// 表驱动解码器
///
/// 按表中顺序逐条尝试，先匹配者胜出；全部落空时返回 `Op::Unknown`。
/// 因此 `decode` 对 0..=255 是全函数。
#[derive(Clone, Copy)]
pub struct DecodeTable {
    name: &'static str,
    defs: &'static [OpcodeDef],
}

impl DecodeTable {
    pub const fn new(name: &'static str, defs: &'static [OpcodeDef]) -> Self {
        Self { name, defs }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 获取定义表
    pub fn defs(&self) -> &'static [OpcodeDef] {
        self.defs
    }

    pub fn decode(&self, raw: u8, next: u8) -> DecodedOp {
        self.defs
            .iter()
            .find(|def| def.matches(raw))
            .map(|def| def.decode_op(raw, next))
            .unwrap_or_else(|| DecodedOp::unknown(raw, next))
    }

    /// 列出所有被更早规则遮蔽的规则对
    pub fn shadowed(&self) -> Vec<Shadowing> {
        let mut found = Vec::new();
        for (i, later) in self.defs.iter().enumerate() {
            for earlier in &self.defs[..i] {
                if earlier.conflicts_with(later) {
                    found.push(Shadowing {
                        earlier: earlier.name,
                        later: later.name,
                    });
                }
            }
        }
        found
    }

    /// 表是否按掩码具体程度非递增排列
    pub fn is_priority_ordered(&self) -> bool {
        self.defs
            .windows(2)
            .all(|w| w[0].specificity() >= w[1].specificity())
    }
}

impl std::fmt::Debug for DecodeTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodeTable")
            .field("name", &self.name)
            .field("defs", &self.defs.len())
            .finish()
    }
}
