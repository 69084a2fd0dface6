//! cdc_vm: ISA 参数化的 8 位教学虚拟机
//!
//! 两遍汇编器把助记符程序翻译成字节码，执行引擎按有序解码表逐条解释执行。
//! 汇编器和执行引擎只依赖 `isa::Isa` trait，换一种 CPU 只需换一个 ISA 定义。
//!
//! # 模块结构
//!
//! - `isa`: ISA 抽象、解码表，以及 CDC8512 / CDC6504 两种定义
//! - `asm`: 两遍汇编器与汇编错误
//! - `cpu`: CPU 核心与执行引擎
//! - `memory`: 256 字节存储体
//! - `sim_env`: 仿真环境（配置、装载、宿主编辑、快照）
//! - `driver`: 基于 tokio 的定时执行驱动器

pub mod asm;
pub mod cpu;
pub mod driver;
pub mod isa;
pub mod memory;
pub mod sim_env;
