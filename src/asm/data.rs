//! DATA 伪指令
//!
//! 两种写法，都从数据地址 0 开始写：
//! - `DATA 'text'`：字符编码加结尾的 0
//! - `DATA 0x00 0A 3`：字节列表，裸写的数字按十六进制，最多 32 个

use super::AsmErrorKind;
use crate::isa::parse_hex_byte;
use crate::memory::{Bank, Memory, MEM_SIZE};

/// 字节列表的最大长度
pub const DATA_LIST_LIMIT: usize = 32;

/// 把一条 DATA 的操作数写入数据存储体
pub fn load(operands: &str, data: &mut Bank) -> Result<usize, AsmErrorKind> {
    match operands.strip_prefix('\'') {
        Some(quoted) => load_string(quoted, data),
        None => load_list(operands, data),
    }
}

fn load_string(quoted: &str, data: &mut Bank) -> Result<usize, AsmErrorKind> {
    let end = quoted
        .find('\'')
        .ok_or_else(|| AsmErrorKind::InvalidOperand("unterminated DATA string".into()))?;
    let trailing = quoted[end + 1..].trim();
    if !trailing.is_empty() {
        return Err(AsmErrorKind::InvalidOperand(format!(
            "unexpected `{trailing}` after DATA string"
        )));
    }
    let bytes = quoted[..end]
        .chars()
        .map(|c| {
            u8::try_from(c).map_err(|_| {
                AsmErrorKind::InvalidOperand(format!("character '{c}' does not fit in a byte"))
            })
        })
        .collect::<Result<Vec<u8>, _>>()?;

    if bytes.len() + 1 > MEM_SIZE {
        return Err(AsmErrorKind::DataOverflow(format!(
            "string of {} bytes plus terminator exceeds data memory",
            bytes.len()
        )));
    }
    data.write_bytes(0, &bytes);
    data.store8(bytes.len() as u8, 0);
    Ok(bytes.len() + 1)
}

fn load_list(operands: &str, data: &mut Bank) -> Result<usize, AsmErrorKind> {
    let tokens = super::lexer::split_operands(operands);
    for (addr, tok) in tokens.iter().enumerate() {
        let value = parse_hex_byte(tok)?;
        if addr >= DATA_LIST_LIMIT {
            return Err(AsmErrorKind::DataOverflow(format!(
                "more than {DATA_LIST_LIMIT} values"
            )));
        }
        data.store8(addr as u8, value);
    }
    Ok(tokens.len())
}
