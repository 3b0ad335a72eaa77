//! # 文件相关系统调用

use crate::error::to_syscall_ret;
use crate::fs::OpenFlags;
use crate::process::ProcessManager;
use crate::syscall::user::{translated_byte_buffer, translated_str};

/// 打开文件，返回文件描述符
pub fn sys_open(manager: &ProcessManager, hart: usize, path: *const u8, flags: u32) -> isize {
    let result = unsafe { translated_str(path) }.and_then(|path| {
        manager.open(hart, &path, OpenFlags::from_bits_truncate(flags))
    });
    to_syscall_ret(result.map(|fd| fd as isize))
}

pub fn sys_close(manager: &ProcessManager, hart: usize, fd: usize) -> isize {
    to_syscall_ret(manager.close(hart, fd).map(|()| 0))
}

/// 从 `fd` 读取最多 `len` 字节到 `buf`，返回读到的字节数
pub fn sys_read(
    manager: &ProcessManager,
    hart: usize,
    fd: usize,
    buf: *mut u8,
    len: usize,
) -> isize {
    let result = unsafe { translated_byte_buffer(buf, len) }
        .and_then(|buf| manager.read(hart, fd, buf));
    to_syscall_ret(result.map(|n| n as isize))
}
