//! # kproc：教学内核的进程管理核心
//!
//! 单核 RISC-V 教学内核中负责进程的那一部分：进程表、陷阱帧上下文切换协议、
//! 轮转（round robin）调度，以及 fork / exec / exit / wait / sleep 等生命周期
//! 系统调用和进程级文件描述符表。
//!
//! ## 模块组织
//!
//! - [`trap`]     - 陷阱帧 `TrapFrame`、寄存器下标约定、陷阱分发
//! - [`process`]  - 进程控制块、进程表、处理器描述符、调度器与生命周期
//! - [`syscall`]  - 系统调用编号与分发，用户指针的转换
//! - [`mm`]       - 页分配器接口（外部协作者）
//! - [`fs`]       - 文件与文件系统接口（外部协作者）
//! - [`loader`]   - 用户程序注册表（外部协作者）
//! - [`timer`]    - 时钟源（外部协作者）
//! - [`sync`]     - 自旋锁与单处理器安全单元
//!
//! ## 控制流
//!
//! ```text
//! trap (ecall / 时钟中断) ──► 陷阱帧保存用户寄存器
//!        │
//!        ▼
//! trap_handler ──► syscall / timer_tick 修改进程表
//!        │
//!        ▼
//! schedule_user_process ──► 选出进程并装入陷阱帧 ──► 返回用户态
//! ```
//!
//! 内核目标上为 `no_std`；测试时链接 `std`，体系结构相关的 CSR / SBI 操作
//! 只在 `riscv64` 上编译。

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod config;
pub mod console;
pub mod error;
pub mod fs;
pub mod loader;
pub mod log;
pub mod mm;
pub mod process;
#[cfg(target_arch = "riscv64")]
pub mod sbi;
pub mod sync;
pub mod syscall;
pub mod timer;
pub mod trap;

pub use error::{FsError, ProcError};
pub use process::{
    ParentRef, Pid, ProcInfo, ProcessManager, ProcessStatus, Schedule, WakeCondition,
};
pub use trap::{TrapCause, TrapFrame, copy_trap_frame, trap_handler};
