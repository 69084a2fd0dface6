//! ISA 选择

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Isa;
use super::cdc6504::CDC6504;
use super::cdc8512::CDC8512;

/// 支持的指令集
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum IsaKind {
    /// 4 个地址寄存器 + 4 个数据寄存器，三态比较标志
    #[default]
    Cdc8512,
    /// 6502 风格的累加器机器，Z/N/C 标志
    Cdc6504,
}

impl IsaKind {
    pub const ALL: [IsaKind; 2] = [IsaKind::Cdc8512, IsaKind::Cdc6504];

    pub fn name(self) -> &'static str {
        match self {
            IsaKind::Cdc8512 => "cdc8512",
            IsaKind::Cdc6504 => "cdc6504",
        }
    }

    /// 对应的 ISA 定义（静态单例）
    pub fn definition(self) -> &'static dyn Isa {
        match self {
            IsaKind::Cdc8512 => &CDC8512,
            IsaKind::Cdc6504 => &CDC6504,
        }
    }
}

impl fmt::Display for IsaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown ISA `{0}` (expected cdc8512 or cdc6504)")]
pub struct UnknownIsa(pub String);

impl FromStr for IsaKind {
    type Err = UnknownIsa;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IsaKind::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownIsa(s.to_string()))
    }
}
