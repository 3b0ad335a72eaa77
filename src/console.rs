//! # 控制台输出模块
//!
//! 提供格式化文本输出功能，实现类似标准库的 `print!` 和 `println!` 宏。
//! 在 RISC-V 目标上通过 SBI 接口输出到控制台；在其他目标（主机测试）上
//! 输出被丢弃。

use core::fmt::{self, Write};

#[cfg(target_arch = "riscv64")]
use crate::sbi::console_putchar;

#[cfg(not(target_arch = "riscv64"))]
fn console_putchar(_c: usize) {}

struct Stdout;

impl Write for Stdout {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            console_putchar(c as usize);
        }
        Ok(())
    }
}

/// 输出格式化参数
///
/// 由 [`print!`] / [`println!`] 宏调用，一般不直接使用。
pub fn print(args: fmt::Arguments) {
    // 控制台写入本身不会失败
    let _ = Stdout.write_fmt(args);
}

#[macro_export]
macro_rules! print {
    ($fmt: literal $(, $($arg: tt)+)?) => {
        $crate::console::print(format_args!($fmt $(, $($arg)+)?));
    }
}

#[macro_export]
macro_rules! println {
    ($fmt: literal $(, $($arg: tt)+)?) => {
        $crate::console::print(format_args!(concat!($fmt, "\n") $(, $($arg)+)?))
    }
}
