//! # 时钟源
//!
//! 进程管理只需要一个单调递增的毫秒时钟来判断 `sleep` 是否到期。
//! 时钟是外部协作者，通过 [`Clock`] trait 注入；RISC-V 目标上提供基于
//! `time` CSR 的 [`CsrClock`]，以及重新设置下一次时钟中断的 [`set_next_trigger`]。

/// 单调时钟
pub trait Clock: Send + Sync {
    /// 当前时间（毫秒）
    fn now_ms(&self) -> u64;
}

/// 读取 `time` CSR 的时钟
#[cfg(target_arch = "riscv64")]
pub struct CsrClock;

#[cfg(target_arch = "riscv64")]
impl Clock for CsrClock {
    fn now_ms(&self) -> u64 {
        use crate::config::CLOCK_FREQ;
        (riscv::register::time::read() / (CLOCK_FREQ / 1000)) as u64
    }
}

/// 设置下一次调度时钟中断，间隔为 `1 / TICKS_PER_SEC` 秒
#[cfg(target_arch = "riscv64")]
pub fn set_next_trigger() {
    use crate::config::{CLOCK_FREQ, TICKS_PER_SEC};
    crate::sbi::set_timer(riscv::register::time::read() + CLOCK_FREQ / TICKS_PER_SEC);
}
