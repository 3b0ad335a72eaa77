//! # 日志系统模块
//!
//! 实现标准的 Rust `log` crate 接口，把日志格式化后通过控制台输出。
//! 进程管理各处直接使用 `log::{info, debug, trace, warn, error}` 宏。
//!
//! ## 日志格式
//!
//! ```text
//! LEVEL [T0001] [CPU0] [module::name] [file.rs:42] message
//! ```
//!
//! ## 颜色方案
//!
//! - **ERROR**: 红色 (31)
//! - **WARN**: 亮黄色 (93)
//! - **INFO**: 蓝色 (34)
//! - **DEBUG**: 绿色 (32)
//! - **TRACE**: 暗灰色 (90)

use core::sync::atomic::{AtomicUsize, Ordering};

use log::{self, Level, LevelFilter, Log, Metadata, Record};

use crate::println;

struct SimpleLogger;

impl Log for SimpleLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        // 级别过滤交给 log::max_level
        true
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let color = match record.level() {
            Level::Error => 31,
            Level::Warn => 93,
            Level::Info => 34,
            Level::Debug => 32,
            Level::Trace => 90,
        };
        let file_name = record
            .file()
            .map(|file| file.rsplit('/').next().unwrap_or(file))
            .unwrap_or("unknown");
        println!(
            "\u{1B}[{}m{:>5} [T{:>4}] [CPU{}] [{}] [{}:{}] {}\u{1B}[0m",
            color,
            record.level(),
            timestamp(),
            hart_id(),
            record.target(),
            file_name,
            record.line().unwrap_or(0),
            record.args()
        );
    }

    fn flush(&self) {}
}

/// 日志序号，用于标识日志的先后顺序
static LOG_SEQ: AtomicUsize = AtomicUsize::new(0);

fn timestamp() -> usize {
    LOG_SEQ.fetch_add(1, Ordering::Relaxed) + 1
}

/// 当前 hart 的编号
///
/// 启动代码约定把 hartid 放在 `tp` 寄存器中。
#[cfg(target_arch = "riscv64")]
fn hart_id() -> usize {
    let id: usize;
    unsafe {
        core::arch::asm!("mv {}, tp", out(reg) id, options(nomem, nostack));
    }
    id
}

#[cfg(not(target_arch = "riscv64"))]
fn hart_id() -> usize {
    0
}

/// 初始化日志系统
///
/// 设置全局日志记录器，并按编译期环境变量 `LOG` 配置日志级别：
///
/// - `LOG=ERROR` / `WARN` / `INFO` / `DEBUG` / `TRACE`
/// - 未设置时默认为 `INFO`
///
/// 重复调用是安全的，只有第一次调用生效。
pub fn init() {
    static LOGGER: SimpleLogger = SimpleLogger;

    if log::set_logger(&LOGGER).is_err() {
        return;
    }
    log::set_max_level(match option_env!("LOG") {
        Some("ERROR") => LevelFilter::Error,
        Some("WARN") => LevelFilter::Warn,
        Some("INFO") => LevelFilter::Info,
        Some("DEBUG") => LevelFilter::Debug,
        Some("TRACE") => LevelFilter::Trace,
        _ => LevelFilter::Info,
    });
}
