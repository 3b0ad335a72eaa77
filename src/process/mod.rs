//! # 进程管理模块
//!
//! 固定大小的进程表、每个 hart 的处理器描述符和陷阱帧，以及在它们之上的
//! 调度和生命周期操作。全部状态集中在一个 [`ProcessManager`] 里，启动时
//! 构造一次，按引用传给陷阱处理和系统调用。
//!
//! ## 模块组织
//!
//! - [`process`]   - 进程控制块、进程状态、pid
//! - [`manager`]   - 进程表与槽位分配、轮转选择
//! - [`processor`] - 处理器描述符、`Hart`、调度器
//! - `lifecycle`   - spawn / fork / exec / exit / wait / sleep / yield
//! - `files`       - 进程级 open / close / read
//! - [`fd_table`]  - 文件描述符表
//!
//! ## 协作者
//!
//! ```text
//!                  ┌──────────────────┐
//!  PageAllocator ─►│                  │◄─ FileSystem
//!                  │  ProcessManager  │
//!  Clock ─────────►│                  │◄─ ProgramRegistry
//!                  └──────────────────┘
//! ```

pub mod fd_table;
mod files;
mod lifecycle;
pub mod manager;
#[allow(clippy::module_inception)]
pub mod process;
pub mod processor;

use alloc::sync::Arc;

use crate::config::MAX_HARTS;
use crate::error::ProcError;
use crate::fs::FileSystem;
use crate::loader::ProgramRegistry;
use crate::mm::PageAllocator;
use crate::timer::Clock;

pub use fd_table::FdTable;
pub use manager::{ProcessTable, ProcessTableInner};
pub use process::{
    ParentRef, Pid, ProcInfo, ProcessControlBlock, ProcessControlBlockInner, ProcessStatus,
    WakeCondition,
};
pub use processor::{Hart, Processor, Schedule};

/// 进程管理上下文
pub struct ProcessManager {
    pub(crate) table: ProcessTable,
    harts: [Hart; MAX_HARTS],
    pub(crate) pages: Arc<dyn PageAllocator>,
    pub(crate) fs: Arc<dyn FileSystem>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) programs: Arc<dyn ProgramRegistry>,
}

impl ProcessManager {
    /// 创建空的进程表
    ///
    /// ## Arguments
    ///
    /// * `boot_kernel_stack` - 启动时的内核栈顶，处理器空闲时使用
    /// * `pages` - 为用户栈和内核栈提供页
    /// * `fs` - 文件系统
    /// * `clock` - 单调毫秒时钟
    /// * `programs` - 用户程序注册表
    pub fn new(
        boot_kernel_stack: usize,
        pages: Arc<dyn PageAllocator>,
        fs: Arc<dyn FileSystem>,
        clock: Arc<dyn Clock>,
        programs: Arc<dyn ProgramRegistry>,
    ) -> Self {
        Self {
            table: ProcessTable::new(),
            harts: core::array::from_fn(|_| Hart::new(boot_kernel_stack)),
            pages,
            fs,
            clock,
            programs,
        }
    }

    pub fn table(&self) -> &ProcessTable {
        &self.table
    }

    /// ## Panics
    ///
    /// `hart` 不小于 [`MAX_HARTS`] 时 panic。
    pub fn hart(&self, hart: usize) -> &Hart {
        &self.harts[hart]
    }

    /// 当前映射在 `hart` 上的槽位
    pub fn current_proc(&self, hart: usize) -> Option<usize> {
        self.hart(hart).processor().current()
    }

    /// 当前映射在 `hart` 上的槽位，必须存在
    ///
    /// ## Panics
    ///
    /// 没有当前进程时 panic：调用者是只有进程上下文里才会走到的内核路径。
    pub fn myproc(&self, hart: usize) -> usize {
        match self.current_proc(hart) {
            Some(slot) => slot,
            None => panic!("hart {} has no current process", hart),
        }
    }

    /// 进程表当前是否处于空闲状态
    pub fn is_idle(&self) -> bool {
        self.table.lock().is_idle
    }

    pub fn num_procs(&self) -> usize {
        self.table.lock().num_procs
    }

    pub fn plist(&self, pids: &mut [u32]) -> usize {
        self.table.plist(pids)
    }

    pub fn pinfo(&self, pid: Pid) -> Result<ProcInfo, ProcError> {
        self.table.pinfo(pid)
    }
}
