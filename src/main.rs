//! cdc_vm 命令行入口
//!
//! 汇编一个源文件并在选定的 ISA 上运行：不带 `--clock-ms` 时同步运行到停机或步数上限，
//! 带 `--clock-ms` 时交给定时驱动器按节拍执行。

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use cdc_vm::cpu::CpuState;
use cdc_vm::driver::{Driver, DriverError};
use cdc_vm::isa::IsaKind;
use cdc_vm::sim_env::{SimConfig, SimEnv, SimError};

#[derive(Parser, Debug)]
#[command(name = "cdc_vm_cli", version, about = "Assemble and run a program on an 8-bit teaching CPU")]
struct Cli {
    /// 汇编源文件
    file: PathBuf,

    /// 指令集
    #[arg(long, value_enum)]
    isa: Option<IsaKind>,

    /// JSON 配置文件，命令行参数优先
    #[arg(long)]
    config: Option<PathBuf>,

    /// 同步运行的最大步数
    #[arg(long)]
    max_steps: Option<u64>,

    /// 以此节拍（毫秒）定时运行
    #[arg(long)]
    clock_ms: Option<u64>,

    /// 打印执行轨迹
    #[arg(long)]
    trace: bool,

    /// 以 JSON 打印最终整机状态
    #[arg(long)]
    dump: bool,

    /// 只打印反汇编，不运行
    #[arg(long)]
    disassemble: bool,

    /// 调试日志
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Sim(#[from] SimError),

    #[error(transparent)]
    Driver(#[from] DriverError),
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(cli: &Cli) -> Result<SimConfig, SimError> {
    let mut config = match &cli.config {
        Some(path) => SimConfig::from_json_file(path)?,
        None => SimConfig::default(),
    };
    if let Some(isa) = cli.isa {
        config = config.with_isa(isa);
    }
    if let Some(max) = cli.max_steps {
        config = config.with_max_steps(max);
    }
    if let Some(ms) = cli.clock_ms {
        config = config.with_clock_period_ms(ms);
    }
    let trace = config.trace || cli.trace;
    let config = config.with_trace(trace);
    config.validate()?;
    Ok(config)
}

fn report(env: &SimEnv, cli: &Cli) -> Result<(), SimError> {
    if cli.trace {
        for entry in env.trace() {
            println!("{:<24} {}", entry.to_string(), entry.registers.render(env.isa().layout()));
        }
    }

    print!("{}", env.output());

    let layout = env.isa().layout();
    println!("{}", env.register_snapshot().render(layout));
    match env.state() {
        CpuState::Running => warn!(steps = env.steps_executed(), "step limit reached"),
        CpuState::Halted => info!(steps = env.steps_executed(), "halted"),
        CpuState::Errored(err) => eprintln!("error: {err}"),
    }

    if cli.dump {
        println!("{}", serde_json::to_string_pretty(&env.snapshot()).map_err(SimError::from)?);
    }
    Ok(())
}

async fn run(cli: &Cli) -> Result<u8, CliError> {
    let config = build_config(cli)?;
    let source = std::fs::read_to_string(&cli.file).map_err(SimError::from)?;

    let mut env = SimEnv::from_config(config);
    env.load_program(&source).map_err(SimError::from)?;
    info!(file = %cli.file.display(), isa = %env.config().isa, "loaded");

    if cli.disassemble {
        for line in env.disassemble() {
            println!("{line}");
        }
        return Ok(0);
    }

    match cli.clock_ms {
        Some(_) => {
            let mut driver = Driver::new(env);
            driver.start()?;
            driver.join().await?;
            let env = driver.env();
            report(&env, cli)?;
            Ok(env.state().code())
        }
        None => {
            env.run_to_limit();
            report(&env, cli)?;
            Ok(env.state().code())
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli).await {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
