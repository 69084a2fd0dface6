//! 两遍汇编器
//!
//! 第一遍只计算地址：每个助记符的长度固定，标签地址在任何字节写出前就已确定。
//! 第二遍调用 `Isa::encode` 写出字节，并处理 DATA 伪指令。
//!
//! 第一遍的错误（未知指令、重复/空标签、程序过大）会阻止第二遍；
//! 第二遍的错误全部收集后一起返回。成功与否是全有或全无的。
//!
//! 第一条 DATA 之后，非 DATA 行在两遍中都被跳过，指令地址就此冻结。

mod data;
mod error;
mod lexer;

use tracing::{debug, info};

pub use data::DATA_LIST_LIMIT;
pub use error::{AsmErrorKind, AssemblyError, AssemblyErrors};

use crate::isa::{EncodeCtx, Isa, LabelTable};
use crate::memory::{Bank, Memory, MEM_SIZE};
use lexer::Line;

/// DATA 伪指令名
pub const DATA_DIRECTIVE: &str = "DATA";

/// 汇编结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub instructions: Bank,
    pub data: Bank,
    /// 指令字节数
    pub len: usize,
    pub labels: LabelTable,
}

impl Program {
    /// 已写出的指令字节
    pub fn bytes(&self) -> &[u8] {
        &self.instructions.as_bytes()[..self.len]
    }
}

/// 面向某个 ISA 的汇编器
///
/// # 示例
///
/// ```
/// use cdc_vm::asm::Assembler;
/// use cdc_vm::isa::IsaKind;
///
/// let program = Assembler::new(IsaKind::Cdc8512.definition())
///     .assemble("SET A0, 1\nHALT")
///     .unwrap();
/// assert_eq!(program.bytes(), &[0x80, 0x01, 0x00]);
/// ```
pub struct Assembler<'i> {
    isa: &'i dyn Isa,
}

impl<'i> Assembler<'i> {
    pub fn new(isa: &'i dyn Isa) -> Self {
        Self { isa }
    }

    pub fn assemble(&self, source: &str) -> Result<Program, AssemblyErrors> {
        let lines: Vec<Line<'_>> = lexer::lines(source, self.isa.comment_chars()).collect();
        let labels = self.collect_labels(&lines).map_err(AssemblyErrors::new)?;
        self.emit(&lines, labels).map_err(AssemblyErrors::new)
    }

    /// 第一遍：标签与地址
    fn collect_labels(&self, lines: &[Line<'_>]) -> Result<LabelTable, Vec<AssemblyError>> {
        let mut labels = LabelTable::new();
        let mut errors = Vec::new();
        let mut address = 0usize;
        let mut data_mode = false;

        for line in lines {
            if let Some(label) = line.label {
                if label.is_empty() {
                    errors.push(AssemblyError::new(line.number, AsmErrorKind::EmptyLabel));
                    continue;
                }
                if labels.contains_key(label) {
                    errors.push(AssemblyError::new(
                        line.number,
                        AsmErrorKind::DuplicateLabel(label.to_string()),
                    ));
                    continue;
                }
                // 恰好写满 256 字节时，末尾标签回绕到 0
                labels.insert(label.to_string(), address as u8);
            }

            let Some(mnemonic) = line.mnemonic.as_deref() else {
                continue;
            };
            if mnemonic == DATA_DIRECTIVE {
                data_mode = true;
                continue;
            }
            if data_mode {
                continue;
            }

            let Some(size) = self.isa.size_of(mnemonic) else {
                errors.push(AssemblyError::new(
                    line.number,
                    AsmErrorKind::UnknownInstruction(mnemonic.to_string()),
                ));
                continue;
            };
            let needed = address + size as usize;
            if needed > MEM_SIZE {
                errors.push(AssemblyError::new(
                    line.number,
                    AsmErrorKind::ProgramTooLarge {
                        needed,
                        limit: MEM_SIZE,
                    },
                ));
                break;
            }
            address = needed;
        }

        if errors.is_empty() {
            Ok(labels)
        } else {
            Err(errors)
        }
    }

    /// 第二遍：写出指令与数据
    fn emit(&self, lines: &[Line<'_>], labels: LabelTable) -> Result<Program, Vec<AssemblyError>> {
        let mut instructions = Bank::new();
        let mut data = Bank::new();
        let mut errors = Vec::new();
        let mut address = 0usize;
        let mut data_mode = false;

        for line in lines {
            let Some(mnemonic) = line.mnemonic.as_deref() else {
                continue;
            };
            if mnemonic == DATA_DIRECTIVE {
                data_mode = true;
                match data::load(line.operands, &mut data) {
                    Ok(n) => debug!(line = line.number, bytes = n, "data"),
                    Err(kind) => errors.push(AssemblyError::new(line.number, kind)),
                }
                continue;
            }
            if data_mode {
                continue;
            }
            let Some(size) = self.isa.size_of(mnemonic) else {
                continue;
            };

            let operands = lexer::split_operands(line.operands);
            let ctx = EncodeCtx {
                address: address as u8,
                labels: &labels,
            };
            match self.isa.encode(mnemonic, &operands, &ctx) {
                Ok(encoding) => {
                    debug_assert_eq!(encoding.len(), size, "{mnemonic} encoded to the wrong size");
                    instructions.write_bytes(ctx.address, encoding.as_bytes());
                    debug!(
                        line = line.number,
                        address = ctx.address,
                        bytes = ?encoding.as_bytes(),
                        "{mnemonic} {}",
                        line.operands
                    );
                }
                Err(kind) => errors.push(AssemblyError::new(line.number, kind)),
            }
            address += size as usize;
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        info!(bytes = address, labels = labels.len(), "assembled program");
        Ok(Program {
            instructions,
            data,
            len: address,
            labels,
        })
    }
}
