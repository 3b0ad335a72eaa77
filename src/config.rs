//! # 内核配置常量
//!
//! 定义了进程管理子系统使用的各种配置参数，包括进程表容量、文件描述符表
//! 容量、页大小、时钟频率等。

/// 进程表槽位数
///
/// 同时存在的进程数上限。进程表是固定数组，不会动态扩展。
pub const MAX_PROCS: usize = 8;

/// 每个进程可同时打开的文件数
pub const MAX_PROC_FDS: usize = 16;

/// 页面大小 (4KB)
///
/// 页分配器分配的基本单位。用户栈与内核栈各占一页。
pub const PAGE_SIZE: usize = 0x1000;

/// 硬件线程（hart）数
///
/// 目前只支持单核；每个 hart 拥有自己的陷阱帧与处理器描述符。
pub const MAX_HARTS: usize = 1;

/// 进程名在 `pinfo` 中的最大长度（含结尾的 0）
pub const PROC_NAME_LEN: usize = 16;

/// `exec` 接受的最大参数个数
pub const MAX_EXEC_ARGS: usize = 32;

/// 从用户空间读取字符串时的最大长度
pub const MAX_USER_STR_LEN: usize = 256;

/// 时钟频率 (Hz)
///
/// QEMU virt 平台 `time` CSR 的计数频率。
pub const CLOCK_FREQ: usize = 12_500_000;

/// 每秒的调度时钟中断次数
pub const TICKS_PER_SEC: usize = 100;
