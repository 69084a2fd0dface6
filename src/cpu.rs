//! CPU 核心与执行引擎
//!
//! 本模块定义了参数化 ISA 的单线程 CPU 核心 `CpuCore`，
//! 包含寄存器文件、标志、程序计数器以及取指-解码-执行循环。
//!
//! 每一步：
//! 1. 读取 `imem[PC]` 与 `imem[PC+1]` 并按 ISA 解码
//! 2. 未知操作码直接进入 Errored(InvalidOpcode)
//! 3. 分派到执行单元，写寄存器时触发按角色的隐式装入/存储
//! 4. 检查地址寄存器范围
//! 5. 未发生跳转时 PC 前进指令长度
//! 6. 追加一条轨迹记录

use tracing::{debug, info, warn};

use crate::isa::{Isa, Reg};
use crate::memory::Memory;

mod builder;
mod exu;
mod fault;
mod status;
mod trace;

pub use builder::CpuBuilder;
pub use fault::{CpuState, RuntimeError};
pub use status::{Comparison, Flags, RegFile, RegisterSnapshot};
pub use trace::{Trace, TraceEntry};

use exu::Flow;

/// 单线程 CPU 核心
///
/// 设计约定：
/// - 寄存器、PC 均为 8 位，运算按 256 回绕
/// - 指令内存与数据内存由调用方持有，每步以参数传入
/// - 停机或出错后 `step` 不再执行任何操作
pub struct CpuCore {
    isa: &'static dyn Isa,
    regs: RegFile,
    flags: Flags,
    pc: u8,
    state: CpuState,
    trace: Trace,
    /// HALT 时输出的字符串
    output: String,
}

impl CpuCore {
    /// 创建一个新的 CPU 核心，PC 从 0 开始
    ///
    /// # 示例
    ///
    /// ```
    /// use cdc_vm::cpu::CpuCore;
    /// use cdc_vm::isa::IsaKind;
    ///
    /// let cpu = CpuCore::new(IsaKind::Cdc8512.definition());
    /// assert_eq!(cpu.pc(), 0);
    /// ```
    pub fn new(isa: &'static dyn Isa) -> Self {
        Self::with_config(isa, 0, Trace::new(true))
    }

    pub(crate) fn with_config(isa: &'static dyn Isa, entry_pc: u8, trace: Trace) -> Self {
        CpuCore {
            isa,
            regs: RegFile::new(),
            flags: Flags::reset(isa.flag_model()),
            pc: entry_pc,
            state: CpuState::Running,
            trace,
            output: String::new(),
        }
    }

    pub fn isa(&self) -> &'static dyn Isa {
        self.isa
    }

    /// 获取当前程序计数器值
    pub fn pc(&self) -> u8 {
        self.pc
    }

    pub fn set_pc(&mut self, pc: u8) {
        self.pc = pc;
    }

    /// 获取当前 CPU 状态
    pub fn state(&self) -> CpuState {
        self.state
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub(crate) fn flags_mut(&mut self) -> &mut Flags {
        &mut self.flags
    }

    pub fn read_reg(&self, reg: Reg) -> u8 {
        self.regs.read(reg)
    }

    /// 直接写寄存器，不更新标志，不触发隐式访存
    pub fn set_reg(&mut self, reg: Reg, value: u8) {
        self.regs.write(reg, value)
    }

    /// 指令写回路径：写寄存器、更新 Z/N、执行按角色的隐式访存、检查地址范围
    pub fn write_register(
        &mut self,
        dmem: &mut dyn Memory,
        reg: Reg,
        value: u8,
        pc: u8,
    ) -> Result<(), RuntimeError> {
        self.regs.write(reg, value);
        self.flags.note_result(value);
        exu::mem::implicit_access(self, dmem, reg);
        self.check_address_range(pc)
    }

    /// 所有地址寄存器必须小于 ISA 规定的上限
    pub fn check_address_range(&self, pc: u8) -> Result<(), RuntimeError> {
        let layout = self.isa.layout();
        let Some(limit) = layout.address_limit else {
            return Ok(());
        };
        for register in layout.address_registers() {
            let value = self.regs.read(register);
            if value >= limit {
                return Err(RuntimeError::AddressOutOfRange {
                    pc,
                    register,
                    value,
                });
            }
        }
        Ok(())
    }

    /// 从外部写寄存器（与指令写回等价）；出错时 CPU 进入 Errored
    pub fn host_write_register(
        &mut self,
        dmem: &mut dyn Memory,
        reg: Reg,
        value: u8,
    ) -> Result<(), RuntimeError> {
        let pc = self.pc;
        self.write_register(dmem, reg, value, pc).inspect_err(|&err| {
            warn!(%err, "host register write faulted");
            self.state = CpuState::Errored(err);
        })
    }

    /// 寄存器快照
    pub fn snapshot(&self) -> RegisterSnapshot {
        RegisterSnapshot {
            pc: self.pc,
            regs: self.regs.snapshot(),
            flags: self.flags,
        }
    }

    /// 恢复寄存器、标志、PC 与状态
    pub fn restore(&mut self, snapshot: &RegisterSnapshot, state: CpuState) {
        for (i, &value) in snapshot.regs.iter().enumerate() {
            self.regs.write(i as Reg, value);
        }
        self.flags = snapshot.flags;
        self.pc = snapshot.pc;
        self.state = state;
    }

    pub fn trace(&self) -> &[TraceEntry] {
        self.trace.entries()
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    /// 寄存器、标志、PC、状态、轨迹与输出全部清零
    pub fn reset(&mut self) {
        self.regs.clear();
        self.flags = Flags::reset(self.isa.flag_model());
        self.pc = 0;
        self.state = CpuState::Running;
        self.trace.clear();
        self.output.clear();
    }

    /// 从正常停机恢复运行；运行期错误不可恢复
    pub fn resume(&mut self) -> bool {
        match self.state {
            CpuState::Running => true,
            CpuState::Halted => {
                debug!(pc = self.pc, "resuming after halt");
                self.state = CpuState::Running;
                true
            }
            CpuState::Errored(_) => false,
        }
    }

    /// 无论当前状态都切回运行，供手动单步使用；PC 不变
    pub fn force_running(&mut self) {
        if let CpuState::Errored(err) = self.state {
            warn!(pc = self.pc, %err, "manual step after fault");
        }
        self.state = CpuState::Running;
    }

    /// 单步执行
    ///
    /// 停机或出错后返回 `None`；否则返回本步的轨迹记录
    /// （包括导致出错的那一步）。
    pub fn step(&mut self, imem: &dyn Memory, dmem: &mut dyn Memory) -> Option<TraceEntry> {
        if !self.state.is_running() {
            return None;
        }

        let pc = self.pc;
        let decoded = self.isa.decode(imem.load8(pc), imem.load8(pc.wrapping_add(1)));

        match exu::execute(self, dmem, &decoded, pc) {
            Flow::Next => self.pc = pc.wrapping_add(decoded.size),
            Flow::Jump(target) => self.pc = target,
            Flow::Halt => {
                self.pc = pc.wrapping_add(decoded.size);
                self.flush_output(dmem);
                self.state = CpuState::Halted;
                info!(pc, "halted");
            }
            // PC 停在出错指令上
            Flow::Fault(err) => {
                warn!(%err, "run-time fault");
                self.state = CpuState::Errored(err);
            }
        }

        let entry = TraceEntry {
            pc,
            bytes: decoded.bytes(),
            text: self.isa.format_op(&decoded),
            registers: self.snapshot(),
        };
        debug!(pc, op = %entry.text, "step");
        self.trace.push(entry.clone());
        Some(entry)
    }

    /// 运行直到停机、出错或达到 `max_steps`
    ///
    /// 返回 (执行的步数, 最终状态)
    pub fn run(&mut self, imem: &dyn Memory, dmem: &mut dyn Memory, max_steps: u64) -> (u64, CpuState) {
        let mut executed = 0;
        while executed < max_steps && self.step(imem, dmem).is_some() {
            executed += 1;
        }
        (executed, self.state)
    }

    fn flush_output(&mut self, dmem: &dyn Memory) {
        let text = dmem.read_cstring(0);
        debug!(%text, "flushing data memory to output");
        self.output.push_str(&text);
        self.output.push('\n');
    }
}

impl std::fmt::Debug for CpuCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuCore")
            .field("isa", &self.isa.kind())
            .field("pc", &self.pc)
            .field("regs", &self.regs)
            .field("flags", &self.flags)
            .field("state", &self.state)
            .finish()
    }
}
