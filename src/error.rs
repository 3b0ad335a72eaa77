//! # 错误类型
//!
//! 进程管理中所有可恢复的失败都用 [`ProcError`] 表示，最终在系统调用边界
//! 通过 [`ProcError::errno`] 转换成负数返回值写入 `a0`。内核不变量被破坏
//! （例如要求存在当前进程却没有）不属于这里，直接 `panic!`。

use core::fmt;

const ENOENT: isize = 2;
const ESRCH: isize = 3;
const EIO: isize = 5;
const E2BIG: isize = 7;
const EBADF: isize = 9;
const ECHILD: isize = 10;
const EAGAIN: isize = 11;
const ENOMEM: isize = 12;
const EFAULT: isize = 14;
const EINVAL: isize = 22;
const ENFILE: isize = 23;
const EMFILE: isize = 24;
const ENOSYS: isize = 38;

/// 文件系统协作者报告的错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    /// 路径不存在
    NotFound,
    /// 全局打开文件表已满
    NoFreeFiles,
    /// 文件不可读
    NotReadable,
    /// 底层设备错误
    Io,
}

impl FsError {
    pub fn errno(&self) -> isize {
        match self {
            FsError::NotFound => -ENOENT,
            FsError::NoFreeFiles => -ENFILE,
            FsError::NotReadable => -EBADF,
            FsError::Io => -EIO,
        }
    }
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsError::NotFound => write!(f, "no such file"),
            FsError::NoFreeFiles => write!(f, "global file table full"),
            FsError::NotReadable => write!(f, "file not opened for reading"),
            FsError::Io => write!(f, "i/o error"),
        }
    }
}

/// 进程管理中的可恢复错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcError {
    /// 进程表没有空闲槽位
    ProcessTableFull,
    /// 页分配器无法提供新的页
    OutOfMemory,
    /// 程序注册表中找不到该名字
    ProgramNotFound,
    /// `wait` 时调用者没有子进程
    NoChildren,
    /// 进程的文件描述符表已满
    TooManyOpenFiles,
    /// 文件描述符越界或未打开
    BadFileDescriptor,
    /// 不存在该 pid 的进程
    NoSuchProcess,
    /// 空指针或非法参数
    InvalidArgument,
    /// 用户指针无法读取（未以 0 结尾等）
    BadAddress,
    /// `exec` 参数放不进栈页
    ArgumentsTooLong,
    /// 未知的系统调用号
    UnknownSyscall(usize),
    /// 文件系统错误
    Fs(FsError),
}

impl ProcError {
    /// 转换为系统调用返回值（负数）
    pub fn errno(&self) -> isize {
        match self {
            ProcError::ProcessTableFull => -EAGAIN,
            ProcError::OutOfMemory => -ENOMEM,
            ProcError::ProgramNotFound => -ENOENT,
            ProcError::NoChildren => -ECHILD,
            ProcError::TooManyOpenFiles => -EMFILE,
            ProcError::BadFileDescriptor => -EBADF,
            ProcError::NoSuchProcess => -ESRCH,
            ProcError::InvalidArgument => -EINVAL,
            ProcError::BadAddress => -EFAULT,
            ProcError::ArgumentsTooLong => -E2BIG,
            ProcError::UnknownSyscall(_) => -ENOSYS,
            ProcError::Fs(err) => err.errno(),
        }
    }
}

impl From<FsError> for ProcError {
    fn from(err: FsError) -> Self {
        ProcError::Fs(err)
    }
}

impl fmt::Display for ProcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcError::ProcessTableFull => write!(f, "process table full"),
            ProcError::OutOfMemory => write!(f, "out of pages"),
            ProcError::ProgramNotFound => write!(f, "program not found"),
            ProcError::NoChildren => write!(f, "no child processes"),
            ProcError::TooManyOpenFiles => write!(f, "too many open files"),
            ProcError::BadFileDescriptor => write!(f, "bad file descriptor"),
            ProcError::NoSuchProcess => write!(f, "no such process"),
            ProcError::InvalidArgument => write!(f, "invalid argument"),
            ProcError::BadAddress => write!(f, "bad user address"),
            ProcError::ArgumentsTooLong => write!(f, "argument list too long"),
            ProcError::UnknownSyscall(id) => write!(f, "unknown syscall {}", id),
            ProcError::Fs(err) => write!(f, "fs: {}", err),
        }
    }
}

/// 把操作结果折叠成 `a0` 中的返回值
pub fn to_syscall_ret(result: Result<isize, ProcError>) -> isize {
    match result {
        Ok(value) => value,
        Err(err) => err.errno(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_to_negative_codes() {
        assert_eq!(ProcError::NoChildren.errno(), -10);
        assert_eq!(ProcError::Fs(FsError::NotFound).errno(), -2);
        assert_eq!(to_syscall_ret(Ok(7)), 7);
        assert!(to_syscall_ret(Err(ProcError::ProcessTableFull)) < 0);
    }
}
