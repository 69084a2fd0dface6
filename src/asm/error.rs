//! 汇编期错误

use std::fmt;

use thiserror::Error;

/// 汇编错误种类
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AsmErrorKind {
    #[error("unknown instruction `{0}`")]
    UnknownInstruction(String),

    #[error("duplicate label `{0}`")]
    DuplicateLabel(String),

    #[error("empty label name")]
    EmptyLabel,

    #[error("undefined label `{0}`")]
    UndefinedLabel(String),

    #[error("invalid operand: {0}")]
    InvalidOperand(String),

    #[error("program too large: {needed} bytes exceed the {limit}-byte instruction memory")]
    ProgramTooLarge { needed: usize, limit: usize },

    #[error("data overflow: {0}")]
    DataOverflow(String),

    #[error("branch target too far (offset {0}, must be -128 to 127)")]
    BranchOutOfRange(i32),
}

/// 带行号的汇编错误（行号从 1 开始）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {kind}")]
pub struct AssemblyError {
    pub line: usize,
    pub kind: AsmErrorKind,
}

impl AssemblyError {
    pub fn new(line: usize, kind: AsmErrorKind) -> Self {
        Self { line, kind }
    }
}

/// 一次汇编收集到的全部错误，至少一条
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyErrors(Vec<AssemblyError>);

impl AssemblyErrors {
    pub(crate) fn new(errors: Vec<AssemblyError>) -> Self {
        debug_assert!(!errors.is_empty());
        Self(errors)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AssemblyError> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<AssemblyError> {
        self.0
    }
}

impl fmt::Display for AssemblyErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AssemblyErrors {}

impl<'a> IntoIterator for &'a AssemblyErrors {
    type Item = &'a AssemblyError;
    type IntoIter = std::slice::Iter<'a, AssemblyError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
