//! # SBI (Supervisor Binary Interface) 封装
//!
//! 基于 `sbi-rt` 提供与 RISC-V SBI 固件的交互接口，仅在 `riscv64` 目标上编译。
//!
//! ## 提供能力
//! - 控制台输出：[`console_putchar`]
//! - 定时器：[`set_timer`]

/// 向控制台输出一个字符（legacy 扩展）
pub fn console_putchar(c: usize) {
    #[allow(deprecated)]
    sbi_rt::legacy::console_putchar(c);
}

/// 设置下一次时钟中断的绝对时间（timebase 计数）
pub fn set_timer(timer: usize) {
    sbi_rt::set_timer(timer as _);
}
