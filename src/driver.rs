//! 定时执行驱动器
//!
//! `start()` 在当前 tokio 运行时上派生一个任务，每个时钟节拍执行一步，
//! 直到停机、出错或 `stop()`。虚拟机以 `Arc<Mutex<SimEnv>>` 共享，
//! 每个节拍只持锁执行一步，宿主可以在节拍之间读取或编辑状态。

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::runtime::{Handle, TryCurrentError};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::cpu::TraceEntry;
use crate::sim_env::SimEnv;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("no tokio runtime available: {0}")]
    NoRuntime(#[from] TryCurrentError),

    #[error("clock period must be non-zero")]
    ZeroPeriod,

    #[error("clock task failed: {0}")]
    Task(#[from] JoinError),
}

/// 时钟驱动器
pub struct Driver {
    env: Arc<Mutex<SimEnv>>,
    period: Duration,
    task: Option<JoinHandle<()>>,
}

impl Driver {
    /// 节拍取自环境配置的 `clock_period_ms`
    pub fn new(env: SimEnv) -> Self {
        let period = env.config().clock_period();
        Self {
            env: Arc::new(Mutex::new(env)),
            period,
            task: None,
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// 锁定虚拟机，持有期间驱动器不会执行下一步
    pub fn env(&self) -> MutexGuard<'_, SimEnv> {
        lock_env(&self.env)
    }

    pub fn shared(&self) -> Arc<Mutex<SimEnv>> {
        Arc::clone(&self.env)
    }

    /// 定时任务是否仍在运行
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// 开始定时执行，第一步在一个节拍之后
    ///
    /// 已在运行或虚拟机已停止时返回 `Ok(false)`。停机后需先 `single_step`
    /// 或 `reset`。节拍为零时返回 `ZeroPeriod`。
    pub fn start(&mut self) -> Result<bool, DriverError> {
        if self.period.is_zero() {
            return Err(DriverError::ZeroPeriod);
        }
        if self.is_running() || !self.env().is_running() {
            return Ok(false);
        }
        let handle = Handle::try_current()?;
        let env = Arc::clone(&self.env);
        let period = self.period;

        self.task = Some(handle.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let running = {
                    let mut env = lock_env(&env);
                    env.step().is_some() && env.is_running()
                };
                if !running {
                    break;
                }
            }
            debug!("clock loop finished");
        }));
        info!(period_ms = period.as_millis() as u64, "driver started");
        Ok(true)
    }

    /// 停止定时执行，返回之前是否在运行
    pub fn stop(&mut self) -> bool {
        let Some(task) = self.task.take() else {
            return false;
        };
        let was_running = !task.is_finished();
        task.abort();
        if was_running {
            info!("driver stopped");
        }
        was_running
    }

    /// 停止定时执行后手动执行一步
    ///
    /// 虚拟机不在运行状态时先切回运行。出错后 PC 仍指向出错指令，
    /// 所以这一步会重新执行它。
    pub fn single_step(&mut self) -> Option<TraceEntry> {
        self.stop();
        let mut env = self.env();
        env.force_running();
        env.step()
    }

    pub fn reset(&mut self) {
        self.stop();
        self.env().reset();
    }

    /// 等待定时任务自然结束（停机或出错）
    ///
    /// 任务 panic 时返回 `DriverError::Task`；被 `stop()` 取消的不算错误。
    pub async fn join(&mut self) -> Result<(), DriverError> {
        let Some(task) = self.task.take() else {
            return Ok(());
        };
        match task.await {
            Err(err) if err.is_panic() => Err(err.into()),
            _ => Ok(()),
        }
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("period", &self.period)
            .field("running", &self.is_running())
            .finish()
    }
}

fn lock_env(env: &Mutex<SimEnv>) -> MutexGuard<'_, SimEnv> {
    env.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::{CpuState, RuntimeError};
    use crate::isa::IsaKind;

    fn driver(source: &str) -> Driver {
        let mut env = SimEnv::new(IsaKind::Cdc8512);
        env.load_program(source).expect("program assembles");
        Driver::new(env)
    }

    #[tokio::test(start_paused = true)]
    async fn test_halting_program_completes() {
        let mut driver = driver("SET X0, 1\nINC X0\nHALT").with_period(Duration::from_millis(10));
        assert!(driver.start().unwrap());
        assert!(!driver.start().unwrap(), "重复 start 不应派生第二个任务");
        driver.join().await.unwrap();

        let env = driver.env();
        assert_eq!(env.state(), CpuState::Halted);
        assert_eq!(env.register("X0").unwrap(), 2);
        assert_eq!(env.steps_executed(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_step_per_tick_and_stop() {
        let mut driver = driver("loop: INC X0\nJP loop");
        assert_eq!(driver.period(), Duration::from_millis(500));
        driver.start().unwrap();

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(driver.env().steps_executed(), 2);
        assert!(driver.is_running());

        assert!(driver.stop());
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(driver.env().steps_executed(), 2);
        assert!(!driver.is_running());
        assert!(!driver.stop());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fault_ends_clock_loop() {
        let mut driver = driver("SET A0, 40\nHALT").with_period(Duration::from_millis(1));
        driver.start().unwrap();
        driver.join().await.unwrap();
        assert!(matches!(
            driver.env().state(),
            CpuState::Errored(RuntimeError::AddressOutOfRange { .. })
        ));
        assert!(!driver.start().unwrap());
    }

    #[test]
    fn test_start_without_runtime() {
        let mut driver = driver("HALT");
        assert!(matches!(driver.start(), Err(DriverError::NoRuntime(_))));
    }

    #[test]
    fn test_single_step_resumes_clean_halt() {
        let mut driver = driver("HALT\nINC X0\nHALT");
        assert_eq!(driver.single_step().map(|e| e.text), Some("HALT".to_string()));
        assert_eq!(driver.single_step().map(|e| e.pc), Some(1));
        assert_eq!(driver.env().register("X0").unwrap(), 1);
    }

    #[test]
    fn test_single_step_reruns_faulting_instruction() {
        let mut driver = driver("SET A0, 40");
        assert!(driver.single_step().is_some());
        let fault = driver.env().state();
        assert!(matches!(fault, CpuState::Errored(RuntimeError::AddressOutOfRange { .. })));

        // 手动单步切回运行，但出错指令再次执行并再次出错
        let entry = driver.single_step().expect("manual step runs after fault");
        assert_eq!(entry.pc, 0);
        assert_eq!(driver.env().state(), fault);
    }

    #[test]
    fn test_single_step_after_patching_bad_opcode() {
        let mut driver = driver("SET X0, 1\nHALT");
        driver.env().write_instruction(2, 0x3C);
        driver.single_step();
        assert!(driver.single_step().is_some());
        assert!(matches!(
            driver.env().state(),
            CpuState::Errored(RuntimeError::InvalidOpcode { pc: 2, opcode: 0x3C })
        ));

        driver.env().write_instruction(2, 0x00);
        assert_eq!(driver.single_step().map(|e| e.text), Some("HALT".to_string()));
        assert_eq!(driver.env().state(), CpuState::Halted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_period_rejected() {
        let mut driver = driver("loop: JP loop").with_period(Duration::ZERO);
        assert!(matches!(driver.start(), Err(DriverError::ZeroPeriod)));
        assert!(!driver.is_running());
        assert!(driver.join().await.is_ok());
    }

    #[tokio::test]
    async fn test_join_reports_panicked_task() {
        let mut driver = driver("HALT");
        driver.task = Some(tokio::spawn(async { panic!("clock task blew up") }));
        let err = driver.join().await.unwrap_err();
        assert!(matches!(err, DriverError::Task(ref e) if e.is_panic()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_after_stop_is_ok() {
        let mut driver = driver("loop: JP loop");
        driver.start().unwrap();
        driver.stop();
        assert!(driver.join().await.is_ok());
    }

    #[test]
    fn test_reset() {
        let mut driver = driver("INC X0\nHALT");
        driver.single_step();
        driver.reset();
        let env = driver.env();
        assert_eq!(env.register("X0").unwrap(), 0);
        assert_eq!(env.steps_executed(), 0);
    }
}
