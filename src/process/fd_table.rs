//! # 文件描述符表
//!
//! 每个进程固定 [`MAX_PROC_FDS`] 个槽位，槽位要么为空，要么持有一个共享的
//! 文件句柄。描述符就是槽位下标。

use crate::config::MAX_PROC_FDS;
use crate::error::ProcError;
use crate::fs::{FileHandle, FileSystem};

pub struct FdTable {
    slots: [Option<FileHandle>; MAX_PROC_FDS],
}

impl FdTable {
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| None),
        }
    }

    /// 把句柄放进第一个空槽位，返回描述符
    ///
    /// 表满时返回 [`ProcError::TooManyOpenFiles`]，表保持不变，传入的句柄被
    /// 丢弃（引用计数减一）。
    pub fn alloc(&mut self, file: FileHandle) -> Result<usize, ProcError> {
        let fd = self
            .slots
            .iter()
            .position(|slot| slot.is_none())
            .ok_or(ProcError::TooManyOpenFiles)?;
        self.slots[fd] = Some(file);
        Ok(fd)
    }

    /// 清空槽位并返回其中的句柄
    ///
    /// 越界或本来就空的描述符不做任何事。
    pub fn free(&mut self, fd: usize) -> Option<FileHandle> {
        self.slots.get_mut(fd).and_then(|slot| slot.take())
    }

    pub fn get(&self, fd: usize) -> Option<&FileHandle> {
        self.slots.get(fd).and_then(|slot| slot.as_ref())
    }

    /// fork 用：每个非空槽位与原表共享同一个句柄
    pub fn duplicate(&self) -> Self {
        Self {
            slots: self.slots.clone(),
        }
    }

    /// 关闭所有打开的描述符
    pub fn close_all(&mut self, fs: &dyn FileSystem) {
        for slot in self.slots.iter_mut() {
            if let Some(file) = slot.take() {
                fs.close(file);
            }
        }
    }

    /// 已打开的描述符个数
    pub fn open_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

impl Default for FdTable {
    fn default() -> Self {
        Self::new()
    }
}
