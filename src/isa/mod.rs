//! ISA 抽象与解码框架
//!
//! 汇编器和执行引擎只依赖本模块定义的 `Isa` trait，具体编码全部在各 ISA 文件里：
//! - `Op`: 操作的语义表示，两种 CPU 共用
//! - `OpcodeDef` / `DecodeTable`: 有序的 (mask, match, decode) 表，先匹配者胜出
//! - `RegisterLayout`: 寄存器名、角色（数据 / 装入地址 / 存储地址）
//! - `IsaKind`: 按名称选择 ISA

mod config;
mod fields;
mod instr;
mod instr_def;
mod layout;
mod operand;

pub mod cdc6504;
pub mod cdc8512;

use std::fmt;

pub use config::{IsaKind, UnknownIsa};
pub use instr::{Condition, DecodedOp, Op, Reg, Source};
pub use instr_def::{
    DecodeTable, OpcodeDef, Shadowing, EXACT_MASK, PREFIX2_MASK, PREFIX4_MASK, PREFIX5_MASK,
};
pub use layout::{FlagModel, RegRole, RegisterLayout, MAX_REGS};
pub use operand::{
    parse_char, parse_hex_byte, parse_value, relative_offset, resolve_operand, resolve_target, EncodeCtx,
    LabelTable, DIRECT_TARGET_LIMIT,
};

use crate::asm::AsmErrorKind;

/// 助记符及其固定长度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mnemonic {
    pub name: &'static str,
    pub size: u8,
}

impl Mnemonic {
    pub const fn new(name: &'static str, size: u8) -> Self {
        Self { name, size }
    }
}

/// 一条指令的编码结果（1 或 2 字节）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Encoding {
    bytes: [u8; 2],
    len: u8,
}

impl Encoding {
    pub const fn one(op: u8) -> Self {
        Self { bytes: [op, 0], len: 1 }
    }

    pub const fn two(op: u8, operand: u8) -> Self {
        Self {
            bytes: [op, operand],
            len: 2,
        }
    }

    pub fn len(&self) -> u8 {
        self.len
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }
}

/// 指令集定义
///
/// 纯描述，无副作用。切换 CPU 只需换一个实现。
pub trait Isa: Send + Sync + fmt::Debug {
    fn kind(&self) -> IsaKind;

    fn layout(&self) -> &'static RegisterLayout;

    fn flag_model(&self) -> FlagModel;

    /// 行内注释起始字符
    fn comment_chars(&self) -> &'static [char];

    /// 全部可汇编的助记符（大写）
    fn mnemonics(&self) -> &'static [Mnemonic];

    /// 解码表，顺序即优先级
    fn decode_table(&self) -> &'static DecodeTable;

    /// 编码一条指令；`mnemonic` 已转为大写，`operands` 已去除空白
    fn encode(
        &self,
        mnemonic: &str,
        operands: &[&str],
        ctx: &EncodeCtx<'_>,
    ) -> Result<Encoding, AsmErrorKind>;

    /// 反汇编文本
    fn format_op(&self, op: &DecodedOp) -> String;

    /// 助记符长度，未知助记符返回 `None`
    fn size_of(&self, mnemonic: &str) -> Option<u8> {
        self.mnemonics()
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(mnemonic))
            .map(|m| m.size)
    }

    /// 对 0..=255 全定义：未匹配的字节返回 `Op::Unknown`
    fn decode(&self, byte: u8, next: u8) -> DecodedOp {
        self.decode_table().decode(byte, next)
    }

    fn disassemble(&self, byte: u8, next: u8) -> String {
        self.format_op(&self.decode(byte, next))
    }

    fn register(&self, name: &str) -> Result<Reg, AsmErrorKind> {
        self.layout()
            .index_of(name)
            .ok_or_else(|| AsmErrorKind::InvalidOperand(format!("unknown register `{name}`")))
    }
}

/// 检查操作数个数
pub(crate) fn expect_operands<'a, const N: usize>(
    mnemonic: &str,
    operands: &[&'a str],
) -> Result<[&'a str; N], AsmErrorKind> {
    <[&str; N]>::try_from(operands).map_err(|_| {
        AsmErrorKind::InvalidOperand(format!(
            "{mnemonic} expects {N} operand(s), got {}",
            operands.len()
        ))
    })
}

#[cfg(test)]
mod tests;
