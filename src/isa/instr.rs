//! 操作的语义表示
//!
//! 两种 CPU 的编码完全不同，但解码后都落到同一组操作类别上，
//! 执行引擎只认识这里定义的 `Op`。

use serde::{Deserialize, Serialize};

/// 寄存器编号（寄存器文件中的下标）
pub type Reg = u8;

/// 操作数来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// 立即数
    Imm(u8),
    /// 数据内存，可选变址寄存器（有效地址按 256 回绕）
    Mem { addr: u8, index: Option<Reg> },
    /// 寄存器
    Reg(Reg),
}

/// 跳转/分支条件
///
/// 两种标志模型都能回答所有条件，见 `Flags::test`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    Always,
    Equal,
    Less,
    Greater,
    Zero,
    NotZero,
    Negative,
    Positive,
    CarrySet,
    CarryClear,
}

/// 解码后的操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// 停机（HALT / BRK）
    Halt,
    /// 空操作（数据段标记）
    Nop,
    /// 装入：`dst <- src`
    Load { dst: Reg, src: Source },
    /// 存储：`mem[addr + index] <- src`
    Store { src: Reg, addr: u8, index: Option<Reg> },
    /// 清零
    Clear { reg: Reg },
    /// 加法，带进位输出
    Add { dst: Reg, src: Source },
    /// 减法，进位 = 无借位
    Sub { dst: Reg, src: Source },
    Inc { reg: Reg },
    Dec { reg: Reg },
    /// 比较，只影响标志
    Compare { reg: Reg, src: Source },
    /// 寄存器间传送
    Transfer { dst: Reg, src: Reg },
    /// 绝对跳转
    Jump { cond: Condition, target: u8 },
    /// 相对分支，偏移相对于下一条指令地址
    Branch { cond: Condition, offset: i8 },
    /// 未匹配任何解码规则
    Unknown,
}

impl Op {
    pub fn is_unknown(&self) -> bool {
        matches!(self, Op::Unknown)
    }
}

/// 解码结果：操作 + 原始字节 + 消耗的字节数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedOp {
    /// 操作码字节
    pub raw: u8,
    /// 紧随其后的字节（单字节指令忽略）
    pub next: u8,
    /// 助记符
    pub name: &'static str,
    /// 指令长度（1 或 2）
    pub size: u8,
    pub op: Op,
}

impl DecodedOp {
    /// 未知操作码，按 1 字节计
    pub fn unknown(raw: u8, next: u8) -> Self {
        DecodedOp {
            raw,
            next,
            name: "Unknown",
            size: 1,
            op: Op::Unknown,
        }
    }

    /// 指令实际占用的字节
    pub fn bytes(&self) -> Vec<u8> {
        if self.size == 2 {
            vec![self.raw, self.next]
        } else {
            vec![self.raw]
        }
    }
}
