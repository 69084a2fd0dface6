//! Register vocabulary and flag model of an ISA.

use serde::{Deserialize, Serialize};

use super::instr::Reg;

/// Upper bound on registers any ISA may declare.
pub const MAX_REGS: usize = 8;

/// What writing a register does to data memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegRole {
    /// Plain data register, no side effect.
    Data,
    /// Address register: after a write, `paired = mem[self]`.
    Load(Reg),
    /// Address register: after a write, `mem[self] = paired`.
    Store(Reg),
}

impl RegRole {
    pub fn is_address(self) -> bool {
        !matches!(self, RegRole::Data)
    }
}

/// Which flag state the ISA keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlagModel {
    /// Three-state less/equal/greater, set only by compares.
    Comparison,
    /// Independent zero/negative/carry bits.
    StatusBits,
}

#[derive(Debug)]
pub struct RegisterLayout {
    pub names: &'static [&'static str],
    /// Extra accepted spellings (e.g. `A` for `ACC`).
    pub aliases: &'static [(&'static str, Reg)],
    pub roles: &'static [RegRole],
    /// Address registers must stay below this value.
    pub address_limit: Option<u8>,
}

impl RegisterLayout {
    pub fn count(&self) -> usize {
        self.names.len()
    }

    /// Case-insensitive lookup over names and aliases.
    pub fn index_of(&self, name: &str) -> Option<Reg> {
        self.names
            .iter()
            .position(|n| n.eq_ignore_ascii_case(name))
            .map(|i| i as Reg)
            .or_else(|| {
                self.aliases
                    .iter()
                    .find(|(alias, _)| alias.eq_ignore_ascii_case(name))
                    .map(|&(_, reg)| reg)
            })
    }

    pub fn name(&self, reg: Reg) -> &'static str {
        self.names.get(reg as usize).copied().unwrap_or("?")
    }

    pub fn role(&self, reg: Reg) -> RegRole {
        self.roles.get(reg as usize).copied().unwrap_or(RegRole::Data)
    }

    pub fn address_registers(&self) -> impl Iterator<Item = Reg> + '_ {
        (0..self.count() as Reg).filter(|&r| self.role(r).is_address())
    }
}
