//! # 进程相关系统调用

use alloc::string::String;
use alloc::vec::Vec;

use crate::config::MAX_PROCS;
use crate::error::{to_syscall_ret, ProcError};
use crate::process::{Pid, ProcInfo, ProcessManager};
use crate::syscall::user::{
    translated_argv, translated_refmut, translated_slice_mut, translated_str,
};
use crate::syscall::SyscallReturn;

/// 结束当前进程，不会返回到调用者
pub fn sys_exit(manager: &ProcessManager, hart: usize, exit_code: i32) -> SyscallReturn {
    SyscallReturn::Rescheduled(manager.exit(hart, exit_code))
}

pub fn sys_yield(manager: &ProcessManager, hart: usize) -> SyscallReturn {
    SyscallReturn::Rescheduled(manager.yield_now(hart))
}

/// 睡眠 `ms` 毫秒，醒来后返回 0
pub fn sys_sleep(manager: &ProcessManager, hart: usize, ms: usize) -> SyscallReturn {
    SyscallReturn::Rescheduled(manager.sleep(hart, ms as u64))
}

pub fn sys_getpid(manager: &ProcessManager, hart: usize) -> isize {
    manager.getpid(hart).0 as isize
}

/// 父进程返回子进程 pid，子进程返回 0
pub fn sys_fork(manager: &ProcessManager, hart: usize) -> isize {
    to_syscall_ret(manager.fork(hart).map(|pid| pid.0 as isize))
}

/// 执行程序 `path`，`argv` 是以 0 结尾的字符串指针数组
///
/// 成功时返回 argc（同时也是新映像的 `a0`）。
pub fn sys_exec(
    manager: &ProcessManager,
    hart: usize,
    path: *const u8,
    argv: *const usize,
) -> isize {
    let load = || -> Result<(String, Vec<String>), ProcError> {
        // 用户地址恒等映射
        unsafe { Ok((translated_str(path)?, translated_argv(argv)?)) }
    };
    let result = load().and_then(|(path, args)| {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        manager.execv(hart, &path, &args)
    });
    to_syscall_ret(result.map(|argc| argc as isize))
}

/// 等待任意子进程退出，返回其 pid；没有子进程时立即返回错误
pub fn sys_wait(manager: &ProcessManager, hart: usize) -> SyscallReturn {
    match manager.wait(hart) {
        Ok(schedule) => SyscallReturn::Rescheduled(schedule),
        Err(err) => SyscallReturn::Value(err.errno()),
    }
}

/// 把存活进程的 pid 写入 `pids[..cap]`，返回写入个数
///
/// 存活进程不会超过 [`MAX_PROCS`] 个，`cap` 先截到这个上限。
pub fn sys_plist(manager: &ProcessManager, pids: *mut u32, cap: usize) -> isize {
    let pids = match unsafe { translated_slice_mut(pids, cap.min(MAX_PROCS)) } {
        Ok(pids) => pids,
        Err(err) => return err.errno(),
    };
    manager.plist(pids) as isize
}

/// 把 `pid` 的信息写入 `info`
pub fn sys_pinfo(manager: &ProcessManager, pid: usize, info: *mut ProcInfo) -> isize {
    let result = unsafe { translated_refmut(info) }.and_then(|info| {
        let pid = u32::try_from(pid).map_err(|_| ProcError::NoSuchProcess)?;
        *info = manager.pinfo(Pid(pid))?;
        Ok(0)
    });
    to_syscall_ret(result)
}
