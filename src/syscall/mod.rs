//! # 系统调用处理模块
//!
//! 用户程序通过 `ecall` 请求内核服务：`a7` 是系统调用号，`a0..a3` 是参数，
//! 返回值写回 `a0`，负数表示错误码。
//!
//! ## 系统调用编号
//!
//! 沿用 Linux 的编号，进程信息查询使用 500 以上的私有编号：
//! - `SYSCALL_OPEN` (56)   - 打开文件
//! - `SYSCALL_CLOSE` (57)  - 关闭文件
//! - `SYSCALL_READ` (63)   - 读文件
//! - `SYSCALL_EXIT` (93)   - 进程退出
//! - `SYSCALL_SLEEP` (101) - 睡眠若干毫秒
//! - `SYSCALL_YIELD` (124) - 让出 CPU
//! - `SYSCALL_PID` (172)   - 获取当前进程 pid
//! - `SYSCALL_FORK` (220)  - 创建子进程
//! - `SYSCALL_EXEC` (221)  - 执行新程序
//! - `SYSCALL_WAIT` (260)  - 等待任意子进程
//! - `SYSCALL_PLIST` (500) - 列出存活进程
//! - `SYSCALL_PINFO` (501) - 查询进程信息
//!
//! ## 返回值
//!
//! 会让调用者离开 CPU 的调用（exit / yield / sleep / 成功的 wait）返回
//! [`SyscallReturn::Rescheduled`]：此时活动陷阱帧里可能已经是另一个进程，
//! 陷阱处理不能再写 `a0`，这些调用自己负责把返回值放进调用者保存的上下文。

mod fs;
mod process;
pub mod user;

use log::warn;

use crate::error::ProcError;
use crate::process::{ProcessManager, Schedule};

pub use fs::*;
pub use process::*;

pub const SYSCALL_OPEN: usize = 56;
pub const SYSCALL_CLOSE: usize = 57;
pub const SYSCALL_READ: usize = 63;
pub const SYSCALL_EXIT: usize = 93;
pub const SYSCALL_SLEEP: usize = 101;
pub const SYSCALL_YIELD: usize = 124;
pub const SYSCALL_PID: usize = 172;
pub const SYSCALL_FORK: usize = 220;
pub const SYSCALL_EXEC: usize = 221;
pub const SYSCALL_WAIT: usize = 260;
pub const SYSCALL_PLIST: usize = 500;
pub const SYSCALL_PINFO: usize = 501;

/// 一次系统调用的结果
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyscallReturn {
    /// 调用者继续运行，把该值写入 `a0`
    Value(isize),
    /// 已经重新调度，不要再碰活动陷阱帧
    Rescheduled(Schedule),
}

/// 系统调用分发器
///
/// ## Arguments
///
/// * `manager` - 进程管理上下文
/// * `hart` - 发起调用的 hart
/// * `syscall_id` - 系统调用编号（`a7`）
/// * `args` - 参数 `a0..a3`
///
/// 未知编号返回 `-ENOSYS`，不会 panic。
pub fn syscall(
    manager: &ProcessManager,
    hart: usize,
    syscall_id: usize,
    args: [usize; 4],
) -> SyscallReturn {
    let ret = match syscall_id {
        SYSCALL_OPEN => sys_open(manager, hart, args[0] as *const u8, args[1] as u32),
        SYSCALL_CLOSE => sys_close(manager, hart, args[0]),
        SYSCALL_READ => sys_read(manager, hart, args[0], args[1] as *mut u8, args[2]),
        SYSCALL_EXIT => return sys_exit(manager, hart, args[0] as i32),
        SYSCALL_SLEEP => return sys_sleep(manager, hart, args[0]),
        SYSCALL_YIELD => return sys_yield(manager, hart),
        SYSCALL_PID => sys_getpid(manager, hart),
        SYSCALL_FORK => sys_fork(manager, hart),
        SYSCALL_EXEC => sys_exec(manager, hart, args[0] as *const u8, args[1] as *const usize),
        SYSCALL_WAIT => return sys_wait(manager, hart),
        SYSCALL_PLIST => sys_plist(manager, args[0] as *mut u32, args[1]),
        SYSCALL_PINFO => sys_pinfo(manager, args[0], args[1] as *mut crate::process::ProcInfo),
        _ => {
            warn!("unsupported syscall {}", syscall_id);
            ProcError::UnknownSyscall(syscall_id).errno()
        }
    };
    SyscallReturn::Value(ret)
}
