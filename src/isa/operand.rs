//! 操作数字面量解析
//!
//! 两种 ISA 共用的字面量规则：
//! - `'c'`：单个 ASCII 字符（0–127）
//! - `0x2A`：十六进制
//! - `42`：十进制
//! - 标签名：解析为标签地址

use std::collections::BTreeMap;

use crate::asm::AsmErrorKind;

/// 标签表：名称 -> 指令地址
pub type LabelTable = BTreeMap<String, u8>;

/// 以数字直接给出的跳转目标必须小于此值
pub const DIRECT_TARGET_LIMIT: u8 = 32;

/// 编码一条指令时所需的上下文
#[derive(Debug, Clone, Copy)]
pub struct EncodeCtx<'a> {
    /// 当前指令地址
    pub address: u8,
    pub labels: &'a LabelTable,
}

/// 解析 8-bit 字面量（字符、十六进制或十进制）
pub fn parse_value(tok: &str) -> Result<u8, AsmErrorKind> {
    if tok.starts_with('\'') {
        return parse_char(tok);
    }
    let parsed = match strip_hex_prefix(tok) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => tok.parse::<u32>(),
    };
    match parsed {
        Ok(v) if v <= 0xFF => Ok(v as u8),
        Ok(v) => Err(invalid(format!("value {v} out of range 0-255"))),
        Err(_) => Err(invalid(format!("`{tok}` is not a number"))),
    }
}

/// 解析 `'c'` 字符字面量
pub fn parse_char(tok: &str) -> Result<u8, AsmErrorKind> {
    let inner = tok
        .strip_prefix('\'')
        .and_then(|t| t.strip_suffix('\''))
        .ok_or_else(|| invalid(format!("malformed character literal {tok}")))?;
    let mut chars = inner.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() => Ok(c as u8),
        (Some(c), None) => Err(invalid(format!(
            "character '{c}' is outside ASCII 0-127"
        ))),
        _ => Err(invalid(format!("malformed character literal {tok}"))),
    }
}

/// 十六进制字节：`0x` 前缀可选
pub fn parse_hex_byte(tok: &str) -> Result<u8, AsmErrorKind> {
    let digits = strip_hex_prefix(tok).unwrap_or(tok);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid(format!("`{tok}` is not a hex byte")));
    }
    u32::from_str_radix(digits, 16)
        .ok()
        .filter(|&v| v <= 0xFF)
        .map(|v| v as u8)
        .ok_or_else(|| invalid(format!("`{tok}` out of range 0x00-0xFF")))
}

/// 解析一个值操作数：先查标签，标识符形式却未声明的报 `UndefinedLabel`，其余按字面量
pub fn resolve_operand(tok: &str, ctx: &EncodeCtx<'_>) -> Result<u8, AsmErrorKind> {
    if let Some(&addr) = ctx.labels.get(tok) {
        return Ok(addr);
    }
    if looks_like_label(tok) {
        return Err(AsmErrorKind::UndefinedLabel(tok.to_string()));
    }
    parse_value(tok)
}

/// 解析跳转/分支目标：已声明的标签，或小于 `DIRECT_TARGET_LIMIT` 的数字
pub fn resolve_target(tok: &str, ctx: &EncodeCtx<'_>) -> Result<u8, AsmErrorKind> {
    if let Some(&addr) = ctx.labels.get(tok) {
        return Ok(addr);
    }
    let value = resolve_operand(tok, ctx)?;
    if value >= DIRECT_TARGET_LIMIT {
        return Err(invalid(format!(
            "jump address {value} out of range 0-{}",
            DIRECT_TARGET_LIMIT - 1
        )));
    }
    Ok(value)
}

/// 计算相对分支偏移：`target - (address + size)`，并按 8-bit 补码编码
pub fn relative_offset(target: u8, size: u8, ctx: &EncodeCtx<'_>) -> Result<u8, AsmErrorKind> {
    let offset = target as i32 - (ctx.address as i32 + size as i32);
    if !(-128..=127).contains(&offset) {
        return Err(AsmErrorKind::BranchOutOfRange(offset));
    }
    Ok(offset as i8 as u8)
}

/// 标识符形式且不是数字字面量
fn looks_like_label(tok: &str) -> bool {
    let mut chars = tok.chars();
    let starts_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '.');
    starts_ok && strip_hex_prefix(tok).is_none()
}

fn strip_hex_prefix(tok: &str) -> Option<&str> {
    tok.strip_prefix("0x").or_else(|| tok.strip_prefix("0X"))
}

fn invalid(msg: String) -> AsmErrorKind {
    AsmErrorKind::InvalidOperand(msg)
}
