//! # 进程级文件操作
//!
//! 把文件描述符翻译成文件句柄，再交给文件系统协作者。

use log::debug;

use crate::error::{FsError, ProcError};
use crate::fs::{FileHandle, OpenFlags};
use crate::process::ProcessManager;

impl ProcessManager {
    /// 打开 `path` 并放入当前进程的文件描述符表，返回描述符
    ///
    /// 描述符表已满时新打开的句柄被丢弃，返回 [`ProcError::TooManyOpenFiles`]。
    pub fn open(&self, hart: usize, path: &str, flags: OpenFlags) -> Result<usize, ProcError> {
        let slot = self.myproc(hart);
        let file = self.fs.open(path, flags)?;
        let mut proc = self.table.proc(slot).inner_exclusive_access();
        let fd = proc.fd_alloc(file)?;
        debug!("pid {} opened {} as fd {}", proc.pid, path, fd);
        Ok(fd)
    }

    pub fn close(&self, hart: usize, fd: usize) -> Result<(), ProcError> {
        let slot = self.myproc(hart);
        let file = self
            .table
            .proc(slot)
            .inner_exclusive_access()
            .fd_free(fd)
            .ok_or(ProcError::BadFileDescriptor)?;
        self.fs.close(file);
        Ok(())
    }

    /// 从描述符 `fd` 读取到 `buf`，返回读取的字节数
    ///
    /// 读取期间不持有进程锁。
    pub fn read(&self, hart: usize, fd: usize, buf: &mut [u8]) -> Result<usize, ProcError> {
        let file = self.file(hart, fd)?;
        if !file.readable() {
            return Err(FsError::NotReadable.into());
        }
        Ok(file.read(buf)?)
    }

    /// 当前进程 `fd` 上的句柄（共享一份引用）
    pub fn file(&self, hart: usize, fd: usize) -> Result<FileHandle, ProcError> {
        let slot = self.myproc(hart);
        self.table
            .proc(slot)
            .inner_exclusive_access()
            .fd_table
            .get(fd)
            .cloned()
            .ok_or(ProcError::BadFileDescriptor)
    }
}
