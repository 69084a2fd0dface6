//! CDC8512：地址寄存器机器
//!
//! 寄存器 A0–A3（地址）与 X0–X3（数据）。写 A0/A1 会立即把 `mem[A]` 装入 X0/X1，
//! 写 A2/A3 会立即把 X2/X3 存到 `mem[A]`。地址寄存器的值必须小于 32。
//!
//! 编码（`r` 为 3-bit 寄存器号）：
//!
//! | 助记符 | 编码 | 长度 |
//! |---|---|---|
//! | HALT | `0x00` | 1 |
//! | (DATA 标记) | `0x0F` | 1 |
//! | ZERO / CMPZ / INC / DEC | `0x40` / `0x48` / `0x50` / `0x58` \| r | 1 |
//! | SET / CMP / ADD / SUB | `0x80` / `0x88` / `0x90` / `0x98` \| r, imm | 2 |
//! | JE / JL / JG / JP | `0xA0`–`0xA3`, addr | 2 |
//! | ADD / SUB Xd, Xs | `0110ddss` / `0111ddss` | 1 |
//! | MOV d, s | `11dddsss` | 1 |
//!
//! 解码顺序：精确字节，跳转（5-bit 前缀 + 2-bit 条件），5-bit 前缀，4-bit 前缀，2-bit 前缀。

use super::fields::{dst3, hi2, lo2, reg3};
use super::instr_def::{DecodeTable, OpcodeDef, EXACT_MASK, PREFIX2_MASK, PREFIX4_MASK, PREFIX5_MASK};
use super::{
    expect_operands, resolve_operand, resolve_target, Condition, DecodedOp, EncodeCtx, Encoding, FlagModel,
    Isa, IsaKind, Mnemonic, Op, Reg, RegRole, RegisterLayout, Source,
};
use crate::asm::AsmErrorKind;

/// 跳转：高 5 位 `10100`，低 2 位为条件，bit 2 不参与匹配
pub const JUMP_MASK: u8 = 0xFB;

/// X0 在寄存器文件中的下标
const X_BASE: Reg = 4;

pub static CDC8512_LAYOUT: RegisterLayout = RegisterLayout {
    names: &["A0", "A1", "A2", "A3", "X0", "X1", "X2", "X3"],
    aliases: &[],
    roles: &[
        RegRole::Load(4),
        RegRole::Load(5),
        RegRole::Store(6),
        RegRole::Store(7),
        RegRole::Data,
        RegRole::Data,
        RegRole::Data,
        RegRole::Data,
    ],
    address_limit: Some(32),
};

pub static CDC8512_MNEMONICS: &[Mnemonic] = &[
    Mnemonic::new("HALT", 1),
    Mnemonic::new("ZERO", 1),
    Mnemonic::new("CMPZ", 1),
    Mnemonic::new("INC", 1),
    Mnemonic::new("DEC", 1),
    Mnemonic::new("MOV", 1),
    Mnemonic::new("SET", 2),
    Mnemonic::new("CMP", 2),
    Mnemonic::new("ADD", 2),
    Mnemonic::new("SUB", 2),
    Mnemonic::new("JE", 2),
    Mnemonic::new("JL", 2),
    Mnemonic::new("JG", 2),
    Mnemonic::new("JP", 2),
];

fn x_reg(field: u8) -> Reg {
    X_BASE + field
}

/// CDC8512 解码表
pub static CDC8512_OPCODES: &[OpcodeDef] = &[
    // ========== 精确字节 ==========
    OpcodeDef::new("HALT", EXACT_MASK, 0x00, 1, |_, _| Op::Halt),
    OpcodeDef::new("DATA", EXACT_MASK, 0x0F, 1, |_, _| Op::Nop),
    // ========== 跳转 ==========
    OpcodeDef::new("JE", JUMP_MASK, 0xA0, 2, |_, next| Op::Jump {
        cond: Condition::Equal,
        target: next,
    }),
    OpcodeDef::new("JL", JUMP_MASK, 0xA1, 2, |_, next| Op::Jump {
        cond: Condition::Less,
        target: next,
    }),
    OpcodeDef::new("JG", JUMP_MASK, 0xA2, 2, |_, next| Op::Jump {
        cond: Condition::Greater,
        target: next,
    }),
    OpcodeDef::new("JP", JUMP_MASK, 0xA3, 2, |_, next| Op::Jump {
        cond: Condition::Always,
        target: next,
    }),
    // ========== 5-bit 前缀 ==========
    OpcodeDef::new("ZERO", PREFIX5_MASK, 0x40, 1, |raw, _| Op::Clear { reg: reg3(raw) }),
    OpcodeDef::new("CMPZ", PREFIX5_MASK, 0x48, 1, |raw, _| Op::Compare {
        reg: reg3(raw),
        src: Source::Imm(0),
    }),
    OpcodeDef::new("INC", PREFIX5_MASK, 0x50, 1, |raw, _| Op::Inc { reg: reg3(raw) }),
    OpcodeDef::new("DEC", PREFIX5_MASK, 0x58, 1, |raw, _| Op::Dec { reg: reg3(raw) }),
    OpcodeDef::new("SET", PREFIX5_MASK, 0x80, 2, |raw, next| Op::Load {
        dst: reg3(raw),
        src: Source::Imm(next),
    }),
    OpcodeDef::new("CMP", PREFIX5_MASK, 0x88, 2, |raw, next| Op::Compare {
        reg: reg3(raw),
        src: Source::Imm(next),
    }),
    OpcodeDef::new("ADD", PREFIX5_MASK, 0x90, 2, |raw, next| Op::Add {
        dst: reg3(raw),
        src: Source::Imm(next),
    }),
    OpcodeDef::new("SUB", PREFIX5_MASK, 0x98, 2, |raw, next| Op::Sub {
        dst: reg3(raw),
        src: Source::Imm(next),
    }),
    // ========== 4-bit 前缀：数据寄存器间运算 ==========
    OpcodeDef::new("ADD", PREFIX4_MASK, 0x60, 1, |raw, _| Op::Add {
        dst: x_reg(hi2(raw)),
        src: Source::Reg(x_reg(lo2(raw))),
    }),
    OpcodeDef::new("SUB", PREFIX4_MASK, 0x70, 1, |raw, _| Op::Sub {
        dst: x_reg(hi2(raw)),
        src: Source::Reg(x_reg(lo2(raw))),
    }),
    // ========== 2-bit 前缀 ==========
    OpcodeDef::new("MOV", PREFIX2_MASK, 0xC0, 1, |raw, _| Op::Transfer {
        dst: dst3(raw),
        src: reg3(raw),
    }),
];

pub static CDC8512_DECODER: DecodeTable = DecodeTable::new("CDC8512", CDC8512_OPCODES);

#[derive(Debug, Clone, Copy, Default)]
pub struct Cdc8512;

pub static CDC8512: Cdc8512 = Cdc8512;

impl Isa for Cdc8512 {
    fn kind(&self) -> IsaKind {
        IsaKind::Cdc8512
    }

    fn layout(&self) -> &'static RegisterLayout {
        &CDC8512_LAYOUT
    }

    fn flag_model(&self) -> FlagModel {
        FlagModel::Comparison
    }

    fn comment_chars(&self) -> &'static [char] {
        &[';', '#']
    }

    fn mnemonics(&self) -> &'static [Mnemonic] {
        CDC8512_MNEMONICS
    }

    fn decode_table(&self) -> &'static DecodeTable {
        &CDC8512_DECODER
    }

    fn encode(
        &self,
        mnemonic: &str,
        operands: &[&str],
        ctx: &EncodeCtx<'_>,
    ) -> Result<Encoding, AsmErrorKind> {
        match mnemonic {
            "HALT" => {
                expect_operands::<0>(mnemonic, operands)?;
                Ok(Encoding::one(0x00))
            }
            "ZERO" | "CMPZ" | "INC" | "DEC" => {
                let [reg] = expect_operands(mnemonic, operands)?;
                let base = match mnemonic {
                    "ZERO" => 0x40,
                    "CMPZ" => 0x48,
                    "INC" => 0x50,
                    _ => 0x58,
                };
                Ok(Encoding::one(base | self.register(reg)?))
            }
            "SET" | "CMP" | "ADD" | "SUB" => {
                let [reg, value] = expect_operands(mnemonic, operands)?;
                let base = match mnemonic {
                    "SET" => 0x80,
                    "CMP" => 0x88,
                    "ADD" => 0x90,
                    _ => 0x98,
                };
                Ok(Encoding::two(
                    base | self.register(reg)?,
                    resolve_operand(value, ctx)?,
                ))
            }
            "JE" | "JL" | "JG" | "JP" => {
                let [target] = expect_operands(mnemonic, operands)?;
                let cond = match mnemonic {
                    "JE" => 0,
                    "JL" => 1,
                    "JG" => 2,
                    _ => 3,
                };
                Ok(Encoding::two(0xA0 | cond, resolve_target(target, ctx)?))
            }
            "MOV" => {
                let [dst, src] = expect_operands(mnemonic, operands)?;
                let (dst, src) = (self.register(dst)?, self.register(src)?);
                Ok(Encoding::one(0xC0 | (dst << 3) | src))
            }
            _ => Err(AsmErrorKind::UnknownInstruction(mnemonic.to_string())),
        }
    }

    fn format_op(&self, decoded: &DecodedOp) -> String {
        let reg = |r: Reg| CDC8512_LAYOUT.name(r);
        let name = decoded.name;
        match decoded.op {
            Op::Halt | Op::Nop => name.to_string(),
            Op::Clear { reg: r } | Op::Inc { reg: r } | Op::Dec { reg: r } => {
                format!("{name} {}", reg(r))
            }
            Op::Compare { reg: r, .. } if name == "CMPZ" => format!("{name} {}", reg(r)),
            Op::Load { dst, src }
            | Op::Add { dst, src }
            | Op::Sub { dst, src }
            | Op::Compare { reg: dst, src } => match src {
                Source::Imm(v) => format!("{name} {}, {v}", reg(dst)),
                Source::Reg(s) => format!("{name} {}, {}", reg(dst), reg(s)),
                Source::Mem { addr, .. } => format!("{name} {}, [{addr}]", reg(dst)),
            },
            Op::Transfer { dst, src } => format!("{name} {}, {}", reg(dst), reg(src)),
            Op::Jump { target, .. } => format!("{name} {target}"),
            Op::Store { .. } | Op::Branch { .. } => name.to_string(),
            Op::Unknown => format!("Unknown (0x{:02X})", decoded.raw),
        }
    }
}
