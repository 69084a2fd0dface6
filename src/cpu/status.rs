//! CPU architectural state components: register file, flags and snapshots.

use serde::{Deserialize, Serialize};

use crate::isa::{Condition, FlagModel, Reg, RegisterLayout, MAX_REGS};

/// Fixed 8-bit register file. ISAs with fewer registers leave the tail unused.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegFile {
    regs: [u8; MAX_REGS],
}

impl RegFile {
    pub fn new() -> Self {
        Self {
            regs: [0; MAX_REGS],
        }
    }

    #[inline]
    pub fn read(&self, reg: Reg) -> u8 {
        self.regs[reg as usize % MAX_REGS]
    }

    #[inline]
    pub fn write(&mut self, reg: Reg, value: u8) {
        self.regs[reg as usize % MAX_REGS] = value;
    }

    pub fn snapshot(&self) -> [u8; MAX_REGS] {
        self.regs
    }

    pub fn clear(&mut self) {
        self.regs = [0; MAX_REGS];
    }
}

/// Result of the last compare in the three-state model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    Less,
    Equal,
    Greater,
}

impl Comparison {
    /// Equality wins over ordering.
    pub fn of(a: u8, b: u8) -> Self {
        match a.cmp(&b) {
            std::cmp::Ordering::Equal => Comparison::Equal,
            std::cmp::Ordering::Less => Comparison::Less,
            std::cmp::Ordering::Greater => Comparison::Greater,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Comparison::Less => '<',
            Comparison::Equal => '=',
            Comparison::Greater => '>',
        }
    }
}

/// Flag state, one variant per flag model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Flags {
    Comparison(Comparison),
    Status { zero: bool, negative: bool, carry: bool },
}

impl Flags {
    /// Reset value for a model.
    pub fn reset(model: FlagModel) -> Self {
        match model {
            FlagModel::Comparison => Flags::Comparison(Comparison::Equal),
            FlagModel::StatusBits => Flags::Status {
                zero: false,
                negative: false,
                carry: false,
            },
        }
    }

    pub fn model(&self) -> FlagModel {
        match self {
            Flags::Comparison(_) => FlagModel::Comparison,
            Flags::Status { .. } => FlagModel::StatusBits,
        }
    }

    /// Compare `a` against `b`. Status model: carry means no borrow.
    pub fn compare(&mut self, a: u8, b: u8) {
        match self {
            Flags::Comparison(c) => *c = Comparison::of(a, b),
            Flags::Status {
                zero,
                negative,
                carry,
            } => {
                *zero = a == b;
                *negative = a.wrapping_sub(b) & 0x80 != 0;
                *carry = a >= b;
            }
        }
    }

    /// Zero/negative from a register result. No-op for the comparison model.
    pub fn note_result(&mut self, value: u8) {
        if let Flags::Status { zero, negative, .. } = self {
            *zero = value == 0;
            *negative = value & 0x80 != 0;
        }
    }

    pub fn set_carry(&mut self, value: bool) {
        if let Flags::Status { carry, .. } = self {
            *carry = value;
        }
    }

    pub fn test(&self, cond: Condition) -> bool {
        match *self {
            Flags::Comparison(c) => match cond {
                Condition::Always => true,
                Condition::Equal | Condition::Zero => c == Comparison::Equal,
                Condition::NotZero => c != Comparison::Equal,
                Condition::Less | Condition::Negative | Condition::CarryClear => {
                    c == Comparison::Less
                }
                Condition::Greater => c == Comparison::Greater,
                Condition::Positive | Condition::CarrySet => c != Comparison::Less,
            },
            Flags::Status {
                zero,
                negative,
                carry,
            } => match cond {
                Condition::Always => true,
                Condition::Equal | Condition::Zero => zero,
                Condition::NotZero => !zero,
                Condition::Negative => negative,
                Condition::Positive => !negative,
                Condition::CarrySet => carry,
                Condition::CarryClear | Condition::Less => !carry,
                Condition::Greater => carry && !zero,
            },
        }
    }
}

impl std::fmt::Display for Flags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Flags::Comparison(c) => write!(f, "CMP={}", c.symbol()),
            Flags::Status {
                zero,
                negative,
                carry,
            } => write!(
                f,
                "Z={} N={} C={}",
                u8::from(*zero),
                u8::from(*negative),
                u8::from(*carry)
            ),
        }
    }
}

/// Registers, flags and PC at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterSnapshot {
    pub pc: u8,
    pub regs: [u8; MAX_REGS],
    pub flags: Flags,
}

impl RegisterSnapshot {
    /// Named view using an ISA's register layout.
    pub fn named(&self, layout: &RegisterLayout) -> Vec<(&'static str, u8)> {
        layout
            .names
            .iter()
            .zip(self.regs.iter())
            .map(|(&name, &value)| (name, value))
            .collect()
    }

    /// One-line rendering such as `PC=04 A0=01 ... CMP==`.
    pub fn render(&self, layout: &RegisterLayout) -> String {
        let mut out = format!("PC={:02X}", self.pc);
        for (name, value) in self.named(layout) {
            out.push_str(&format!(" {name}={value:02X}"));
        }
        out.push(' ');
        out.push_str(&self.flags.to_string());
        out
    }
}
