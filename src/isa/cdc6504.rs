//! CDC6504：6502 风格的累加器机器
//!
//! 寄存器 ACC（别名 A）、X、Y，标志 Z/N/C。所有操作码都是精确字节匹配，
//! 双字节指令的第二字节为立即数、零页地址、绝对跳转地址或相对分支偏移。
//!
//! 操作数语法：
//! - `#v` 或 `v`：立即数
//! - `$hh`：零页地址（十六进制）
//! - `$hh,X` / `$hh,Y`：变址（仅 LDA/STA）
//! - 可在最前面重复写出隐含寄存器，如 `LDA ACC,72`

use super::fields::rel8;
use super::instr_def::{DecodeTable, OpcodeDef, EXACT_MASK};
use super::{
    expect_operands, parse_hex_byte, relative_offset, resolve_operand, resolve_target, Condition,
    DecodedOp, EncodeCtx, Encoding, FlagModel, Isa, IsaKind, Mnemonic, Op, Reg, RegRole,
    RegisterLayout, Source,
};
use crate::asm::AsmErrorKind;

pub const ACC: Reg = 0;
pub const X: Reg = 1;
pub const Y: Reg = 2;

pub static CDC6504_LAYOUT: RegisterLayout = RegisterLayout {
    names: &["ACC", "X", "Y"],
    aliases: &[("A", ACC)],
    roles: &[RegRole::Data, RegRole::Data, RegRole::Data],
    address_limit: None,
};

pub static CDC6504_MNEMONICS: &[Mnemonic] = &[
    Mnemonic::new("BRK", 1),
    Mnemonic::new("TAX", 1),
    Mnemonic::new("TAY", 1),
    Mnemonic::new("TXA", 1),
    Mnemonic::new("TYA", 1),
    Mnemonic::new("INX", 1),
    Mnemonic::new("INY", 1),
    Mnemonic::new("DEX", 1),
    Mnemonic::new("DEY", 1),
    Mnemonic::new("CLX", 1),
    Mnemonic::new("CLY", 1),
    Mnemonic::new("LDA", 2),
    Mnemonic::new("LDX", 2),
    Mnemonic::new("LDY", 2),
    Mnemonic::new("STA", 2),
    Mnemonic::new("STX", 2),
    Mnemonic::new("STY", 2),
    Mnemonic::new("CMP", 2),
    Mnemonic::new("CPX", 2),
    Mnemonic::new("CPY", 2),
    Mnemonic::new("ADC", 2),
    Mnemonic::new("SBC", 2),
    Mnemonic::new("BEQ", 2),
    Mnemonic::new("BNE", 2),
    Mnemonic::new("BMI", 2),
    Mnemonic::new("BPL", 2),
    Mnemonic::new("BCC", 2),
    Mnemonic::new("BCS", 2),
    Mnemonic::new("JMP", 2),
];

fn zp(addr: u8) -> Source {
    Source::Mem { addr, index: None }
}

fn zp_indexed(addr: u8, index: Reg) -> Source {
    Source::Mem {
        addr,
        index: Some(index),
    }
}

/// CDC6504 解码表（全部为精确字节）
pub static CDC6504_OPCODES: &[OpcodeDef] = &[
    OpcodeDef::new("BRK", EXACT_MASK, 0x00, 1, |_, _| Op::Halt),
    // ========== 装入 ==========
    OpcodeDef::new("LDA", EXACT_MASK, 0xA9, 2, |_, n| Op::Load { dst: ACC, src: Source::Imm(n) }),
    OpcodeDef::new("LDA", EXACT_MASK, 0xA5, 2, |_, n| Op::Load { dst: ACC, src: zp(n) }),
    OpcodeDef::new("LDA", EXACT_MASK, 0xB5, 2, |_, n| Op::Load { dst: ACC, src: zp_indexed(n, X) }),
    OpcodeDef::new("LDA", EXACT_MASK, 0xB9, 2, |_, n| Op::Load { dst: ACC, src: zp_indexed(n, Y) }),
    OpcodeDef::new("LDX", EXACT_MASK, 0xA2, 2, |_, n| Op::Load { dst: X, src: Source::Imm(n) }),
    OpcodeDef::new("LDX", EXACT_MASK, 0xA6, 2, |_, n| Op::Load { dst: X, src: zp(n) }),
    OpcodeDef::new("LDY", EXACT_MASK, 0xA0, 2, |_, n| Op::Load { dst: Y, src: Source::Imm(n) }),
    OpcodeDef::new("LDY", EXACT_MASK, 0xA4, 2, |_, n| Op::Load { dst: Y, src: zp(n) }),
    // ========== 存储 ==========
    OpcodeDef::new("STA", EXACT_MASK, 0x85, 2, |_, n| Op::Store { src: ACC, addr: n, index: None }),
    OpcodeDef::new("STA", EXACT_MASK, 0x95, 2, |_, n| Op::Store { src: ACC, addr: n, index: Some(X) }),
    OpcodeDef::new("STA", EXACT_MASK, 0x99, 2, |_, n| Op::Store { src: ACC, addr: n, index: Some(Y) }),
    OpcodeDef::new("STX", EXACT_MASK, 0x86, 2, |_, n| Op::Store { src: X, addr: n, index: None }),
    OpcodeDef::new("STY", EXACT_MASK, 0x84, 2, |_, n| Op::Store { src: Y, addr: n, index: None }),
    // ========== 比较 ==========
    OpcodeDef::new("CMP", EXACT_MASK, 0xC9, 2, |_, n| Op::Compare { reg: ACC, src: Source::Imm(n) }),
    OpcodeDef::new("CMP", EXACT_MASK, 0xC5, 2, |_, n| Op::Compare { reg: ACC, src: zp(n) }),
    OpcodeDef::new("CPX", EXACT_MASK, 0xE0, 2, |_, n| Op::Compare { reg: X, src: Source::Imm(n) }),
    OpcodeDef::new("CPX", EXACT_MASK, 0xE4, 2, |_, n| Op::Compare { reg: X, src: zp(n) }),
    OpcodeDef::new("CPY", EXACT_MASK, 0xC0, 2, |_, n| Op::Compare { reg: Y, src: Source::Imm(n) }),
    OpcodeDef::new("CPY", EXACT_MASK, 0xC4, 2, |_, n| Op::Compare { reg: Y, src: zp(n) }),
    // ========== 算术 ==========
    OpcodeDef::new("ADC", EXACT_MASK, 0x69, 2, |_, n| Op::Add { dst: ACC, src: Source::Imm(n) }),
    OpcodeDef::new("ADC", EXACT_MASK, 0x65, 2, |_, n| Op::Add { dst: ACC, src: zp(n) }),
    OpcodeDef::new("SBC", EXACT_MASK, 0xE9, 2, |_, n| Op::Sub { dst: ACC, src: Source::Imm(n) }),
    OpcodeDef::new("SBC", EXACT_MASK, 0xE5, 2, |_, n| Op::Sub { dst: ACC, src: zp(n) }),
    OpcodeDef::new("INX", EXACT_MASK, 0xE8, 1, |_, _| Op::Inc { reg: X }),
    OpcodeDef::new("INY", EXACT_MASK, 0xC8, 1, |_, _| Op::Inc { reg: Y }),
    OpcodeDef::new("DEX", EXACT_MASK, 0xCA, 1, |_, _| Op::Dec { reg: X }),
    OpcodeDef::new("DEY", EXACT_MASK, 0x88, 1, |_, _| Op::Dec { reg: Y }),
    // ========== 传送 / 清零 ==========
    OpcodeDef::new("TAX", EXACT_MASK, 0xAA, 1, |_, _| Op::Transfer { dst: X, src: ACC }),
    OpcodeDef::new("TAY", EXACT_MASK, 0xA8, 1, |_, _| Op::Transfer { dst: Y, src: ACC }),
    OpcodeDef::new("TXA", EXACT_MASK, 0x8A, 1, |_, _| Op::Transfer { dst: ACC, src: X }),
    OpcodeDef::new("TYA", EXACT_MASK, 0x98, 1, |_, _| Op::Transfer { dst: ACC, src: Y }),
    OpcodeDef::new("CLX", EXACT_MASK, 0xE2, 1, |_, _| Op::Clear { reg: X }),
    OpcodeDef::new("CLY", EXACT_MASK, 0xC2, 1, |_, _| Op::Clear { reg: Y }),
    // ========== 控制转移 ==========
    OpcodeDef::new("BEQ", EXACT_MASK, 0xF0, 2, |_, n| Op::Branch { cond: Condition::Zero, offset: rel8(n) }),
    OpcodeDef::new("BNE", EXACT_MASK, 0xD0, 2, |_, n| Op::Branch { cond: Condition::NotZero, offset: rel8(n) }),
    OpcodeDef::new("BMI", EXACT_MASK, 0x30, 2, |_, n| Op::Branch { cond: Condition::Negative, offset: rel8(n) }),
    OpcodeDef::new("BPL", EXACT_MASK, 0x10, 2, |_, n| Op::Branch { cond: Condition::Positive, offset: rel8(n) }),
    OpcodeDef::new("BCC", EXACT_MASK, 0x90, 2, |_, n| Op::Branch { cond: Condition::CarryClear, offset: rel8(n) }),
    OpcodeDef::new("BCS", EXACT_MASK, 0xB0, 2, |_, n| Op::Branch { cond: Condition::CarrySet, offset: rel8(n) }),
    OpcodeDef::new("JMP", EXACT_MASK, 0x4C, 2, |_, n| Op::Jump { cond: Condition::Always, target: n }),
];

pub static CDC6504_DECODER: DecodeTable = DecodeTable::new("CDC6504", CDC6504_OPCODES);

/// 汇编期的寻址方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operand {
    /// `#v`（`hashed`）或裸值 `v`
    Imm { value: u8, hashed: bool },
    ZeroPage(u8),
    Indexed(u8, Reg),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Cdc6504;

pub static CDC6504: Cdc6504 = Cdc6504;

impl Cdc6504 {
    /// 指令隐含操作的寄存器
    fn implied(mnemonic: &str) -> Reg {
        match mnemonic.as_bytes().get(2) {
            Some(b'X') => X,
            Some(b'Y') => Y,
            _ => ACC,
        }
    }

    fn operand(
        &self,
        mnemonic: &str,
        operands: &[&str],
        ctx: &EncodeCtx<'_>,
    ) -> Result<Operand, AsmErrorKind> {
        let implied = Self::implied(mnemonic);
        // `LDA ACC,72`：跳过与隐含寄存器相同的前导寄存器
        let operands = match operands {
            [first, rest @ ..] if !rest.is_empty() => {
                match CDC6504_LAYOUT.index_of(first) {
                    Some(reg) if reg == implied => rest,
                    Some(_) => {
                        return Err(AsmErrorKind::InvalidOperand(format!(
                            "{mnemonic} operates on {}, not {first}",
                            CDC6504_LAYOUT.name(implied)
                        )));
                    }
                    None => operands,
                }
            }
            _ => operands,
        };

        match operands {
            [tok] => {
                if let Some(addr) = tok.strip_prefix('$') {
                    Ok(Operand::ZeroPage(parse_hex_byte(addr)?))
                } else if let Some(value) = tok.strip_prefix('#') {
                    Ok(Operand::Imm {
                        value: resolve_operand(value, ctx)?,
                        hashed: true,
                    })
                } else {
                    Ok(Operand::Imm {
                        value: resolve_operand(tok, ctx)?,
                        hashed: false,
                    })
                }
            }
            [base, index] => {
                // `$hh,X` 按十六进制，`10,X` 与 `buf,X` 按普通值
                let addr = match base.strip_prefix('$') {
                    Some(hex) => parse_hex_byte(hex)?,
                    None => resolve_operand(base, ctx)?,
                };
                let index = match self.register(index)? {
                    ACC => {
                        return Err(AsmErrorKind::InvalidOperand(
                            "index register must be X or Y".into(),
                        ));
                    }
                    r => r,
                };
                Ok(Operand::Indexed(addr, index))
            }
            _ => Err(AsmErrorKind::InvalidOperand(format!(
                "{mnemonic} expects 1 operand, got {}",
                operands.len()
            ))),
        }
    }
}

fn unsupported(mnemonic: &str, operand: Operand) -> AsmErrorKind {
    AsmErrorKind::InvalidOperand(format!("{mnemonic} does not support {operand:?} addressing"))
}

impl Isa for Cdc6504 {
    fn kind(&self) -> IsaKind {
        IsaKind::Cdc6504
    }

    fn layout(&self) -> &'static RegisterLayout {
        &CDC6504_LAYOUT
    }

    fn flag_model(&self) -> FlagModel {
        FlagModel::StatusBits
    }

    fn comment_chars(&self) -> &'static [char] {
        &[';']
    }

    fn mnemonics(&self) -> &'static [Mnemonic] {
        CDC6504_MNEMONICS
    }

    fn decode_table(&self) -> &'static DecodeTable {
        &CDC6504_DECODER
    }

    fn encode(
        &self,
        mnemonic: &str,
        operands: &[&str],
        ctx: &EncodeCtx<'_>,
    ) -> Result<Encoding, AsmErrorKind> {
        let implied_byte = match mnemonic {
            "BRK" => Some(0x00),
            "TAX" => Some(0xAA),
            "TAY" => Some(0xA8),
            "TXA" => Some(0x8A),
            "TYA" => Some(0x98),
            "INX" => Some(0xE8),
            "INY" => Some(0xC8),
            "DEX" => Some(0xCA),
            "DEY" => Some(0x88),
            "CLX" => Some(0xE2),
            "CLY" => Some(0xC2),
            _ => None,
        };
        if let Some(op) = implied_byte {
            expect_operands::<0>(mnemonic, operands)?;
            return Ok(Encoding::one(op));
        }

        let branch = match mnemonic {
            "BEQ" => Some(0xF0),
            "BNE" => Some(0xD0),
            "BMI" => Some(0x30),
            "BPL" => Some(0x10),
            "BCC" => Some(0x90),
            "BCS" => Some(0xB0),
            _ => None,
        };
        if let Some(op) = branch {
            let [target] = expect_operands(mnemonic, operands)?;
            let target = resolve_target(target, ctx)?;
            return Ok(Encoding::two(op, relative_offset(target, 2, ctx)?));
        }

        if mnemonic == "JMP" {
            let [target] = expect_operands(mnemonic, operands)?;
            return Ok(Encoding::two(0x4C, resolve_target(target, ctx)?));
        }

        // (立即数, 零页, 变址 X, 变址 Y)
        let modes: (Option<u8>, Option<u8>, Option<u8>, Option<u8>) = match mnemonic {
            "LDA" => (Some(0xA9), Some(0xA5), Some(0xB5), Some(0xB9)),
            "LDX" => (Some(0xA2), Some(0xA6), None, None),
            "LDY" => (Some(0xA0), Some(0xA4), None, None),
            "CMP" => (Some(0xC9), Some(0xC5), None, None),
            "CPX" => (Some(0xE0), Some(0xE4), None, None),
            "CPY" => (Some(0xC0), Some(0xC4), None, None),
            "ADC" => (Some(0x69), Some(0x65), None, None),
            "SBC" => (Some(0xE9), Some(0xE5), None, None),
            // 存储没有立即数形式，裸值当作地址
            "STA" => (None, Some(0x85), Some(0x95), Some(0x99)),
            "STX" => (None, Some(0x86), None, None),
            "STY" => (None, Some(0x84), None, None),
            _ => return Err(AsmErrorKind::UnknownInstruction(mnemonic.to_string())),
        };
        let (imm, zero_page, idx_x, idx_y) = modes;

        let operand = self.operand(mnemonic, operands, ctx)?;
        let encoded = match operand {
            Operand::Imm { value, .. } if imm.is_some() => imm.map(|op| Encoding::two(op, value)),
            Operand::Imm { value, hashed: false } => zero_page.map(|op| Encoding::two(op, value)),
            Operand::Imm { hashed: true, .. } => None,
            Operand::ZeroPage(addr) => zero_page.map(|op| Encoding::two(op, addr)),
            Operand::Indexed(addr, X) => idx_x.map(|op| Encoding::two(op, addr)),
            Operand::Indexed(addr, _) => idx_y.map(|op| Encoding::two(op, addr)),
        };
        encoded.ok_or_else(|| unsupported(mnemonic, operand))
    }

    fn format_op(&self, decoded: &DecodedOp) -> String {
        let name = decoded.name;
        let index = |index: Option<Reg>| match index {
            Some(r) => format!(",{}", CDC6504_LAYOUT.name(r)),
            None => String::new(),
        };
        match decoded.op {
            Op::Load { src, .. } | Op::Compare { src, .. } | Op::Add { src, .. } | Op::Sub { src, .. } => {
                match src {
                    Source::Imm(v) => format!("{name} #{v}"),
                    Source::Mem { addr, index: i } => format!("{name} ${addr:02X}{}", index(i)),
                    Source::Reg(r) => format!("{name} {}", CDC6504_LAYOUT.name(r)),
                }
            }
            Op::Store { addr, index: i, .. } => format!("{name} ${addr:02X}{}", index(i)),
            Op::Branch { offset, .. } => format!("{name} {offset:+}"),
            Op::Jump { target, .. } => format!("{name} {target}"),
            Op::Unknown => format!("Unknown (0x{:02X})", decoded.raw),
            Op::Halt
            | Op::Nop
            | Op::Clear { .. }
            | Op::Inc { .. }
            | Op::Dec { .. }
            | Op::Transfer { .. } => name.to_string(),
        }
    }
}
