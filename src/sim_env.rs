//! 仿真环境
//!
//! 本模块负责：
//! - 读取并解析仿真配置
//! - 汇编源程序并装入指令/数据存储体
//! - 初始化 CPU，提供单步、运行、复位
//! - 宿主侧编辑寄存器和内存、保存与恢复整机状态
//!
//! # 示例
//!
//! ```
//! use cdc_vm::isa::IsaKind;
//! use cdc_vm::sim_env::{SimConfig, SimEnv};
//!
//! let config = SimConfig::default()
//!     .with_isa(IsaKind::Cdc6504)
//!     .with_max_steps(100);
//!
//! let mut env = SimEnv::from_config(config);
//! env.load_program("LDA ACC,72\nSTA $00\nBRK").unwrap();
//! env.run_to_limit();
//! assert_eq!(env.output(), "H\n");
//! ```

use std::io;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::asm::{Assembler, AssemblyErrors, Program};
use crate::cpu::{CpuBuilder, CpuCore, CpuState, RegisterSnapshot, RuntimeError, TraceEntry};
use crate::isa::{Isa, IsaKind, UnknownIsa};
use crate::memory::{Bank, Memory, MEM_SIZE};

/// 仿真环境错误
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    UnknownIsa(#[from] UnknownIsa),

    #[error("assembly failed:\n{0}")]
    Assembly(#[from] AssemblyErrors),

    #[error("unknown register `{0}`")]
    UnknownRegister(String),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("snapshot was taken on {found}, this machine is {expected}")]
    IsaMismatch { expected: IsaKind, found: IsaKind },

    #[error("snapshot memory must be 256 bytes, got {0}")]
    BadSnapshot(usize),

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("clock period must be at least 1 ms")]
    ZeroClockPeriod,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// 仿真配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// 指令集
    pub isa: IsaKind,
    /// 定时驱动器的节拍（毫秒）
    pub clock_period_ms: u64,
    /// 同步运行的最大步数
    pub max_steps: u64,
    /// 是否记录执行轨迹
    pub trace: bool,
    /// 轨迹最多保留的条数，`None` 不限
    pub trace_limit: Option<usize>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            isa: IsaKind::default(),
            clock_period_ms: 500,
            max_steps: 10_000,
            trace: true,
            trace_limit: Some(10_000),
        }
    }
}

impl SimConfig {
    /// 创建新配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 JSON 文本读取，缺省字段取默认值
    pub fn from_json(text: &str) -> Result<Self, SimError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// 检查字段取值
    pub fn validate(&self) -> Result<(), SimError> {
        if self.clock_period_ms == 0 {
            return Err(SimError::ZeroClockPeriod);
        }
        Ok(())
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, SimError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn with_isa(mut self, isa: IsaKind) -> Self {
        self.isa = isa;
        self
    }

    /// 按名称设置指令集（不区分大小写）
    pub fn with_isa_name(mut self, name: &str) -> Result<Self, SimError> {
        self.isa = name.parse()?;
        Ok(self)
    }

    pub fn with_clock_period_ms(mut self, ms: u64) -> Self {
        self.clock_period_ms = ms;
        self
    }

    pub fn with_max_steps(mut self, max: u64) -> Self {
        self.max_steps = max;
        self
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn with_trace_limit(mut self, limit: Option<usize>) -> Self {
        self.trace_limit = limit;
        self
    }

    pub fn clock_period(&self) -> Duration {
        Duration::from_millis(self.clock_period_ms)
    }
}

/// 可序列化的整机状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineSnapshot {
    pub isa: IsaKind,
    pub registers: RegisterSnapshot,
    pub state: CpuState,
    pub instructions: Vec<u8>,
    pub data: Vec<u8>,
}

/// 仿真环境
///
/// 封装了 CPU、两个存储体和仿真配置，提供统一的仿真接口
pub struct SimEnv {
    config: SimConfig,
    cpu: CpuCore,
    instructions: Bank,
    data: Bank,
    /// 最近一次成功装载的程序
    program: Option<Program>,
    steps_executed: u64,
}

impl SimEnv {
    /// 从配置创建仿真环境
    pub fn from_config(config: SimConfig) -> Self {
        let cpu = CpuBuilder::new(config.isa)
            .with_trace(config.trace)
            .with_trace_limit(config.trace_limit)
            .build();
        SimEnv {
            config,
            cpu,
            instructions: Bank::new(),
            data: Bank::new(),
            program: None,
            steps_executed: 0,
        }
    }

    /// 默认配置下的指定 ISA
    pub fn new(isa: IsaKind) -> Self {
        Self::from_config(SimConfig::default().with_isa(isa))
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn isa(&self) -> &'static dyn Isa {
        self.cpu.isa()
    }

    pub fn cpu(&self) -> &CpuCore {
        &self.cpu
    }

    /// 寄存器、标志、PC、两个存储体、轨迹和输出全部清零
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.instructions.clear();
        self.data.clear();
        self.program = None;
        self.steps_executed = 0;
        info!(isa = %self.config.isa, "reset");
    }

    /// 汇编并装载程序
    ///
    /// 成功时先复位再写入两个存储体；失败时机器保持原样。
    pub fn load_program(&mut self, source: &str) -> Result<&Program, AssemblyErrors> {
        let program = Assembler::new(self.isa()).assemble(source)?;
        self.reset();
        self.instructions = program.instructions.clone();
        self.data = program.data.clone();
        info!(bytes = program.len, labels = program.labels.len(), "program loaded");
        Ok(self.program.insert(program))
    }

    pub fn program(&self) -> Option<&Program> {
        self.program.as_ref()
    }

    /// 执行单步，停机或出错后返回 `None`
    pub fn step(&mut self) -> Option<TraceEntry> {
        let entry = self.cpu.step(&self.instructions, &mut self.data)?;
        self.steps_executed += 1;
        Some(entry)
    }

    /// 运行指定步数
    pub fn run(&mut self, max_steps: u64) -> (u64, CpuState) {
        let (executed, state) = self.cpu.run(&self.instructions, &mut self.data, max_steps);
        self.steps_executed += executed;
        (executed, state)
    }

    /// 按配置的步数上限运行
    pub fn run_to_limit(&mut self) -> (u64, CpuState) {
        self.run(self.config.max_steps)
    }

    /// 从正常停机恢复；出错状态不可恢复
    pub fn resume(&mut self) -> bool {
        self.cpu.resume()
    }

    /// 从任意状态切回运行，出错指令会被重新执行
    pub fn force_running(&mut self) {
        self.cpu.force_running();
    }

    pub fn state(&self) -> CpuState {
        self.cpu.state()
    }

    pub fn is_running(&self) -> bool {
        self.cpu.state().is_running()
    }

    pub fn steps_executed(&self) -> u64 {
        self.steps_executed
    }

    pub fn register_snapshot(&self) -> RegisterSnapshot {
        self.cpu.snapshot()
    }

    /// 按名称读寄存器
    pub fn register(&self, name: &str) -> Result<u8, SimError> {
        let reg = self.register_index(name)?;
        Ok(self.cpu.read_reg(reg))
    }

    /// 按名称写寄存器，与指令写回一样触发隐式访存和范围检查
    pub fn write_register(&mut self, name: &str, value: u8) -> Result<(), SimError> {
        let reg = self.register_index(name)?;
        self.cpu.host_write_register(&mut self.data, reg, value)?;
        Ok(())
    }

    fn register_index(&self, name: &str) -> Result<u8, SimError> {
        self.isa()
            .layout()
            .index_of(name)
            .ok_or_else(|| SimError::UnknownRegister(name.to_string()))
    }

    /// 数据存储体副本
    pub fn memory_snapshot(&self) -> [u8; MEM_SIZE] {
        *self.data.as_bytes()
    }

    pub fn data_memory(&self) -> &Bank {
        &self.data
    }

    pub fn instruction_memory(&self) -> &Bank {
        &self.instructions
    }

    pub fn write_data(&mut self, addr: u8, value: u8) {
        self.data.store8(addr, value);
    }

    pub fn write_instruction(&mut self, addr: u8, value: u8) {
        self.instructions.store8(addr, value);
    }

    pub fn trace(&self) -> &[TraceEntry] {
        self.cpu.trace()
    }

    /// HALT 时累积的输出
    pub fn output(&self) -> &str {
        self.cpu.output()
    }

    /// 反汇编已装载的指令
    ///
    /// 有程序时覆盖程序长度，否则覆盖到最后一个非零字节。
    pub fn disassemble(&self) -> Vec<String> {
        let bytes = self.instructions.as_bytes();
        let len = match &self.program {
            Some(program) => program.len,
            None => bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1),
        };

        let isa = self.isa();
        let mut lines = Vec::new();
        let mut addr = 0usize;
        while addr < len {
            let pc = addr as u8;
            let decoded = isa.decode(bytes[addr], self.instructions.load8(pc.wrapping_add(1)));
            let raw: Vec<String> = decoded.bytes().iter().map(|b| format!("{b:02X}")).collect();
            lines.push(format!("{pc:02X}: {:<5}  {}", raw.join(" "), isa.format_op(&decoded)));
            addr += decoded.size as usize;
        }
        lines
    }

    /// 保存整机状态
    pub fn snapshot(&self) -> MachineSnapshot {
        MachineSnapshot {
            isa: self.config.isa,
            registers: self.cpu.snapshot(),
            state: self.cpu.state(),
            instructions: self.instructions.as_bytes().to_vec(),
            data: self.data.as_bytes().to_vec(),
        }
    }

    /// 恢复整机状态；轨迹与输出被清空
    pub fn restore(&mut self, snapshot: &MachineSnapshot) -> Result<(), SimError> {
        if snapshot.isa != self.config.isa {
            return Err(SimError::IsaMismatch {
                expected: self.config.isa,
                found: snapshot.isa,
            });
        }
        let instructions = Bank::from_slice(&snapshot.instructions)
            .ok_or(SimError::BadSnapshot(snapshot.instructions.len()))?;
        let data =
            Bank::from_slice(&snapshot.data).ok_or(SimError::BadSnapshot(snapshot.data.len()))?;

        self.reset();
        self.instructions = instructions;
        self.data = data;
        self.cpu.restore(&snapshot.registers, snapshot.state);
        if let CpuState::Errored(err) = snapshot.state {
            warn!(%err, "restored a faulted machine");
        }
        info!(pc = snapshot.registers.pc, "snapshot restored");
        Ok(())
    }
}

impl std::fmt::Debug for SimEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimEnv")
            .field("config", &self.config)
            .field("cpu", &self.cpu)
            .field("steps_executed", &self.steps_executed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_config_builder() {
        let config = SimConfig::new()
            .with_isa(IsaKind::Cdc6504)
            .with_clock_period_ms(20)
            .with_max_steps(1000)
            .with_trace(false);

        assert_eq!(config.isa, IsaKind::Cdc6504);
        assert_eq!(config.clock_period(), Duration::from_millis(20));
        assert_eq!(config.max_steps, 1000);
        assert!(!config.trace);

        assert!(SimConfig::new().with_isa_name("z80").is_err());
    }

    #[test]
    fn test_sim_config_json_defaults() {
        let config = SimConfig::from_json(r#"{ "isa": "cdc6504", "max_steps": 5 }"#).unwrap();
        assert_eq!(config.isa, IsaKind::Cdc6504);
        assert_eq!(config.max_steps, 5);
        assert_eq!(config.clock_period_ms, 500);
        assert!(SimConfig::from_json("{ not json").is_err());
    }

    #[test]
    fn test_zero_clock_period_rejected() {
        assert!(matches!(
            SimConfig::from_json(r#"{ "clock_period_ms": 0 }"#),
            Err(SimError::ZeroClockPeriod)
        ));
        assert!(SimConfig::new().with_clock_period_ms(0).validate().is_err());
        assert!(SimConfig::new().validate().is_ok());
    }

    #[test]
    fn test_trace_limit_bounds_endless_program() {
        let config = SimConfig::new().with_trace_limit(Some(4));
        let mut env = SimEnv::from_config(config);
        env.load_program("loop: INC X0\nJP loop").unwrap();
        env.run(50);
        assert_eq!(env.steps_executed(), 50);
        assert_eq!(env.trace().len(), 4);
        assert_eq!(env.trace().last().map(|e| e.text.as_str()), Some("JP 0"));
    }

    #[test]
    fn test_sim_env_basic() {
        let mut env = SimEnv::new(IsaKind::Cdc8512);
        env.load_program("SET X0, 42\nHALT").expect("program assembles");

        let entry = env.step().expect("first step runs");
        assert_eq!(entry.text, "SET X0, 42");
        assert_eq!(env.register("x0").unwrap(), 42);
        assert_eq!(env.steps_executed(), 1);
    }

    #[test]
    fn test_failed_load_leaves_machine_untouched() {
        let mut env = SimEnv::new(IsaKind::Cdc8512);
        env.load_program("SET X0, 7\nHALT").unwrap();
        env.run(10);
        let before = env.snapshot();

        let errors = env.load_program("FOO X0, 1").unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(env.snapshot(), before);
        assert_eq!(env.program().map(|p| p.len), Some(3));
    }

    #[test]
    fn test_host_register_write() {
        let mut env = SimEnv::new(IsaKind::Cdc8512);
        env.write_data(9, 0x77);
        env.write_register("A1", 9).unwrap();
        assert_eq!(env.register("X1").unwrap(), 0x77);

        assert!(matches!(
            env.write_register("B7", 1),
            Err(SimError::UnknownRegister(_))
        ));
        assert!(matches!(
            env.write_register("A3", 200),
            Err(SimError::Runtime(RuntimeError::AddressOutOfRange { value: 200, .. }))
        ));
        assert_eq!(env.state().code(), 3);
    }

    #[test]
    fn test_write_instruction_then_step() {
        let mut env = SimEnv::new(IsaKind::Cdc6504);
        env.write_instruction(0, 0xE8); // INX
        env.step();
        assert_eq!(env.register("X").unwrap(), 1);
    }

    #[test]
    fn test_disassemble_listing() {
        let mut env = SimEnv::new(IsaKind::Cdc8512);
        env.load_program("SET A0, 1\nINC X0\nHALT").unwrap();
        assert_eq!(
            env.disassemble(),
            vec!["00: 80 01  SET A0, 1", "02: 54     INC X0", "03: 00     HALT"]
        );
    }

    #[test]
    fn test_snapshot_round_trip_through_json() {
        let mut env = SimEnv::new(IsaKind::Cdc6504);
        env.load_program("LDA #5\nSTA $03\nBRK\nDATA 'ok'").unwrap();
        env.run(10);
        let snapshot = env.snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();

        let mut other = SimEnv::new(IsaKind::Cdc6504);
        other.restore(&serde_json::from_str(&json).unwrap()).unwrap();
        assert_eq!(other.snapshot(), snapshot);
        assert_eq!(other.state(), CpuState::Halted);
        assert_eq!(other.memory_snapshot()[3], 5);
    }

    #[test]
    fn test_restore_rejects_mismatch() {
        let snapshot = SimEnv::new(IsaKind::Cdc6504).snapshot();
        let mut env = SimEnv::new(IsaKind::Cdc8512);
        assert!(matches!(
            env.restore(&snapshot),
            Err(SimError::IsaMismatch { .. })
        ));

        let mut short = SimEnv::new(IsaKind::Cdc8512).snapshot();
        short.data.truncate(10);
        assert!(matches!(env.restore(&short), Err(SimError::BadSnapshot(10))));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut env = SimEnv::new(IsaKind::Cdc8512);
        env.load_program("SET X0, 1\nHALT\nDATA 'x'").unwrap();
        env.run(10);
        env.reset();
        assert_eq!(env.memory_snapshot(), [0; MEM_SIZE]);
        assert_eq!(env.instruction_memory(), &Bank::new());
        assert!(env.trace().is_empty());
        assert!(env.output().is_empty());
        assert!(env.is_running());
        assert_eq!(env.steps_executed(), 0);
    }
}
