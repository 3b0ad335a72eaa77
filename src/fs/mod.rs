//! # 文件系统接口
//!
//! 文件系统是进程管理的外部协作者。进程只关心三件事：按路径打开得到一个
//! 文件句柄、从句柄读取、关闭句柄。
//!
//! ## 句柄共享
//!
//! 文件句柄是 [`FileHandle`]（`Arc<dyn File>`）。fork 时子进程的文件描述符表
//! 复制的是 `Arc`，与父进程共享同一个底层文件对象；引用计数归零时由文件
//! 系统实现负责真正释放。

use alloc::sync::Arc;

use bitflags::bitflags;

use crate::error::FsError;

/// 打开的文件对象
pub trait File: Send + Sync {
    /// 从当前位置读取到 `buf`，返回读取的字节数，0 表示到达末尾
    fn read(&self, buf: &mut [u8]) -> Result<usize, FsError>;

    fn readable(&self) -> bool;

    fn writable(&self) -> bool;
}

/// 进程文件描述符表中保存的共享文件句柄
pub type FileHandle = Arc<dyn File>;

/// 文件系统协作者
pub trait FileSystem: Send + Sync {
    /// 按路径打开文件
    fn open(&self, path: &str, flags: OpenFlags) -> Result<FileHandle, FsError>;

    /// 关闭一个文件描述符持有的句柄
    ///
    /// 默认实现直接丢弃句柄，由 `Arc` 的引用计数决定底层文件何时释放。
    fn close(&self, file: FileHandle) {
        drop(file);
    }
}

bitflags! {
    /// 文件打开标志
    ///
    /// - `RDONLY`: 只读（值为 0）
    /// - `WRONLY`: 只写
    /// - `RDWR`: 读写
    /// - `CREATE`: 不存在时创建
    /// - `TRUNC`: 打开时截断为空
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpenFlags: u32 {
        const RDONLY = 0;
        const WRONLY = 1 << 0;
        const RDWR = 1 << 1;
        const CREATE = 1 << 9;
        const TRUNC = 1 << 10;
    }
}

impl OpenFlags {
    /// 返回 (可读, 可写)
    pub fn read_write(&self) -> (bool, bool) {
        if self.is_empty() {
            (true, false)
        } else if self.contains(Self::WRONLY) {
            (false, true)
        } else {
            (true, true)
        }
    }
}
