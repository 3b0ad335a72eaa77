//! # 进程控制块模块
//!
//! 进程控制块 (Process Control Block, PCB) 是进程表中一个槽位的内容：进程
//! 标识、保存的陷阱帧、拥有的两页栈、状态、唤醒条件以及文件描述符表。
//!
//! ## 核心组件
//!
//! - [`ProcessControlBlock`] - 进程表中的一个槽位，内部可变部分由自旋锁保护
//! - [`ProcessControlBlockInner`] - 受锁保护的全部进程状态
//! - [`ProcessStatus`] - 进程状态，睡眠状态携带 [`WakeCondition`]
//! - [`ParentRef`] - 指向父进程的非拥有引用（pid + 槽位）
//!
//! ## 进程状态转换
//!
//! ```text
//!  Available ──alloc/fork──► Ready ◄──────────────┐
//!      ▲                      │  ▲                │
//!      │                schedule  preempt/yield   │ wake
//!      │                      ▼  │                │
//!      └────────exit──────── Running ──sleep/wait──► Sleeping
//! ```

use core::fmt;

use crate::config::PROC_NAME_LEN;
use crate::error::ProcError;
use crate::fs::FileHandle;
use crate::mm::PhysPage;
use crate::process::fd_table::FdTable;
use crate::sync::{SpinLock, SpinLockGuard};
use crate::trap::TrapFrame;

/// 进程标识符
///
/// 由进程表中单调递增的计数器分配，不回收。
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pid(pub u32);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 指向父进程的非拥有引用
///
/// 槽位会被回收再分配，所以使用前必须确认该槽位里的 pid 仍然是 `pid`。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParentRef {
    pub pid: Pid,
    pub slot: usize,
}

/// 睡眠进程的唤醒条件
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WakeCondition {
    /// 只能被子进程退出显式唤醒（`wait`）
    ChildExit,
    /// 时间到达该时刻（毫秒）后由时钟路径唤醒（`sleep`）
    At(u64),
}

/// 进程状态
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessStatus {
    /// 槽位空闲
    Available,
    /// 可被调度
    Ready,
    /// 正映射在某个 hart 上
    Running,
    /// 睡眠中，调度器不会选中
    Sleeping(WakeCondition),
}

impl ProcessStatus {
    pub const CODE_AVAILABLE: u32 = 0;
    pub const CODE_READY: u32 = 1;
    pub const CODE_RUNNING: u32 = 2;
    pub const CODE_SLEEPING: u32 = 3;

    /// 对用户态公开的状态编号
    pub fn code(&self) -> u32 {
        match self {
            ProcessStatus::Available => Self::CODE_AVAILABLE,
            ProcessStatus::Ready => Self::CODE_READY,
            ProcessStatus::Running => Self::CODE_RUNNING,
            ProcessStatus::Sleeping(_) => Self::CODE_SLEEPING,
        }
    }

    pub fn is_available(&self) -> bool {
        *self == ProcessStatus::Available
    }
}

/// `pinfo` 系统调用填写的进程信息
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProcInfo {
    pub pid: u32,
    /// 以 0 填充的进程名，超长时截断
    pub name: [u8; PROC_NAME_LEN],
    pub state: u32,
}

impl ProcInfo {
    pub fn name(&self) -> &str {
        let end = self.name.iter().position(|&c| c == 0).unwrap_or(PROC_NAME_LEN);
        core::str::from_utf8(&self.name[..end]).unwrap_or("invalid")
    }
}

/// 进程表中的一个槽位
pub struct ProcessControlBlock {
    slot: usize,
    inner: SpinLock<ProcessControlBlockInner>,
}

/// 进程控制块内部可变状态
///
/// 所有字段都受 [`ProcessControlBlock`] 的自旋锁保护。槽位空闲时字段没有意义，
/// 由 `init_proc` 重新初始化。
pub struct ProcessControlBlockInner {
    pub pid: Pid,
    pub name: &'static str,
    pub parent: Option<ParentRef>,

    /// 进程不在 CPU 上时保存的上下文
    pub trap: TrapFrame,

    /// 用户栈页，`exit` 时归还
    pub stack_page: Option<PhysPage>,

    /// 内核栈页。不同进程的系统调用不能共用一个内核栈，否则会互相踩踏。
    pub kstack_page: Option<PhysPage>,

    /// `kstack_page` 内当前的内核栈指针
    pub kernel_stack: usize,

    pub process_status: ProcessStatus,

    /// 文件描述符表
    ///
    /// - `Some(file)` - 描述符已打开，与其他进程（fork 得到的）可能共享同一句柄
    /// - `None` - 描述符未使用
    pub fd_table: FdTable,
}

impl ProcessControlBlock {
    pub fn new(slot: usize) -> Self {
        Self {
            slot,
            inner: SpinLock::new(ProcessControlBlockInner::empty()),
        }
    }

    /// 槽位下标
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// 获取该进程的锁
    ///
    /// 需要同时持有进程表锁时，必须先获取进程表锁。
    pub fn inner_exclusive_access(&self) -> SpinLockGuard<'_, ProcessControlBlockInner> {
        self.inner.lock()
    }
}

impl ProcessControlBlockInner {
    fn empty() -> Self {
        Self {
            pid: Pid(0),
            name: "",
            parent: None,
            trap: TrapFrame::zero_init(),
            stack_page: None,
            kstack_page: None,
            kernel_stack: 0,
            process_status: ProcessStatus::Available,
            fd_table: FdTable::new(),
        }
    }

    /// 恢复到刚分配出来的样子：`Ready`、无父进程、没有打开的文件
    pub(crate) fn reset(&mut self) {
        *self = Self::empty();
        self.process_status = ProcessStatus::Ready;
    }

    pub fn status(&self) -> ProcessStatus {
        self.process_status
    }

    pub fn is_available(&self) -> bool {
        self.process_status.is_available()
    }

    /// 睡眠的到期时间；未睡眠或只等待子进程退出时为 `None`
    pub fn wakeup_time(&self) -> Option<u64> {
        match self.process_status {
            ProcessStatus::Sleeping(WakeCondition::At(time)) => Some(time),
            _ => None,
        }
    }

    /// 是否应当被时钟路径唤醒
    ///
    /// 仅当进程在睡眠、唤醒条件是时间、且 `now` 已到达到期时间时为真。
    /// 等待子进程的睡眠（[`WakeCondition::ChildExit`]）永远返回假。
    pub fn should_wake_up(&self, now: u64) -> bool {
        matches!(self.wakeup_time(), Some(time) if now >= time)
    }

    /// 是否是 `parent` 所指进程的（仍然存活的）子进程
    pub fn is_child_of(&self, parent: ParentRef) -> bool {
        !self.is_available() && self.parent == Some(parent)
    }

    pub fn fd_alloc(&mut self, file: FileHandle) -> Result<usize, ProcError> {
        self.fd_table.alloc(file)
    }

    pub fn fd_free(&mut self, fd: usize) -> Option<FileHandle> {
        self.fd_table.free(fd)
    }

    pub fn info(&self) -> ProcInfo {
        let mut name = [0u8; PROC_NAME_LEN];
        let bytes = self.name.as_bytes();
        let len = bytes.len().min(PROC_NAME_LEN);
        name[..len].copy_from_slice(&bytes[..len]);
        ProcInfo {
            pid: self.pid.0,
            name,
            state: self.process_status.code(),
        }
    }
}
