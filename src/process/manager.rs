//! # 进程表
//!
//! 固定 [`MAX_PROCS`] 个槽位的进程表，以及由进程表锁保护的分配元数据。
//!
//! ## 加锁顺序
//!
//! 两级锁：先进程表锁，再单个进程的锁。本模块中需要进程表锁的函数都以
//! `&mut ProcessTableInner` 作为参数，持有该引用即证明已经持有进程表锁。
//!
//! ```text
//! let mut table = manager.table.lock();               // 1. 进程表锁
//! let pcb = table_slot.inner_exclusive_access();      // 2. 进程锁
//! ```

use crate::config::MAX_PROCS;
use crate::error::ProcError;
use crate::process::process::{
    Pid, ProcInfo, ProcessControlBlock, ProcessControlBlockInner, ProcessStatus,
};
use crate::sync::{SpinLock, SpinLockGuard};

/// 进程表锁保护的元数据
pub struct ProcessTableInner {
    /// 非 `Available` 的槽位数
    pub num_procs: usize,
    /// 下一个要分配的 pid
    pub pid_counter: u32,
    /// 没有任何槽位映射在 CPU 上：陷阱帧里的 pc 指向内核的空闲循环，
    /// 不是某个用户进程的上下文
    pub is_idle: bool,
    /// 轮转扫描上一次考察到的槽位
    pub last_slot: usize,
}

impl ProcessTableInner {
    /// 返回当前计数器的值并递增
    ///
    /// pid 不回收。计数器到 `u32::MAX` 之后回绕到 0，此后不再保证与存活
    /// 进程的 pid 不重复。
    pub fn alloc_pid(&mut self) -> Pid {
        let pid = Pid(self.pid_counter);
        self.pid_counter = self.pid_counter.wrapping_add(1);
        pid
    }
}

pub struct ProcessTable {
    inner: SpinLock<ProcessTableInner>,
    procs: [ProcessControlBlock; MAX_PROCS],
}

impl ProcessTable {
    pub fn new() -> Self {
        Self {
            inner: SpinLock::new(ProcessTableInner {
                num_procs: 0,
                pid_counter: 0,
                is_idle: true,
                last_slot: MAX_PROCS - 1,
            }),
            procs: core::array::from_fn(ProcessControlBlock::new),
        }
    }

    /// 获取进程表锁
    pub fn lock(&self) -> SpinLockGuard<'_, ProcessTableInner> {
        self.inner.lock()
    }

    /// 按槽位下标取进程控制块
    pub fn proc(&self, slot: usize) -> &ProcessControlBlock {
        &self.procs[slot]
    }

    pub fn procs(&self) -> &[ProcessControlBlock] {
        &self.procs
    }

    /// 找一个空闲槽位并初始化为 `Ready`
    ///
    /// 返回槽位下标以及**仍然持有的**该进程的锁，由调用者负责释放（丢弃 guard）。
    /// 进程表已满时返回 [`ProcError::ProcessTableFull`]，不改变任何状态。
    pub fn alloc_process(
        &self,
        table: &mut ProcessTableInner,
    ) -> Result<(usize, SpinLockGuard<'_, ProcessControlBlockInner>), ProcError> {
        for pcb in self.procs.iter() {
            let mut inner = pcb.inner_exclusive_access();
            if inner.is_available() {
                init_proc(table, &mut inner);
                return Ok((pcb.slot(), inner));
            }
        }
        Err(ProcError::ProcessTableFull)
    }

    /// 轮转地寻找下一个 `Ready` 的进程
    ///
    /// 从上一次选中的槽位的下一个开始，回绕着把每个槽位最多看一次；扫描最后
    /// 回到起点时，起点本身（唯一可运行的、或正在运行的进程）也可以被再次选中。
    /// 找到后记为新的起点，因此 `k` 个同时就绪的进程在连续 `k` 次调用中各被
    /// 选中一次。
    ///
    /// 调用者必须持有进程表锁，且不能持有任何进程的锁。
    pub fn find_ready_proc(&self, table: &mut ProcessTableInner) -> Option<usize> {
        let start = table.last_slot;
        for step in 1..=MAX_PROCS {
            let slot = (start + step) % MAX_PROCS;
            let status = self.procs[slot].inner_exclusive_access().status();
            let eligible = match status {
                ProcessStatus::Ready => true,
                ProcessStatus::Running => slot == start,
                _ => false,
            };
            if eligible {
                table.last_slot = slot;
                return Some(slot);
            }
        }
        None
    }

    /// 按 pid 查找存活进程所在的槽位
    pub fn find_pid(&self, _table: &ProcessTableInner, pid: Pid) -> Option<usize> {
        self.procs.iter().position(|pcb| {
            let inner = pcb.inner_exclusive_access();
            !inner.is_available() && inner.pid == pid
        })
    }

    /// 把存活进程的 pid 依次写入 `pids`，写满为止，返回写入个数
    pub fn plist(&self, pids: &mut [u32]) -> usize {
        let _table = self.lock();
        let mut count = 0;
        for pcb in self.procs.iter() {
            if count >= pids.len() {
                break;
            }
            let inner = pcb.inner_exclusive_access();
            if !inner.is_available() {
                pids[count] = inner.pid.0;
                count += 1;
            }
        }
        count
    }

    /// 查询某个存活进程的信息
    pub fn pinfo(&self, pid: Pid) -> Result<ProcInfo, ProcError> {
        let table = self.lock();
        let slot = self.find_pid(&table, pid).ok_or(ProcError::NoSuchProcess)?;
        let info = self.procs[slot].inner_exclusive_access().info();
        Ok(info)
    }

    /// 非 `Available` 槽位的实际个数
    pub fn count_live(&self) -> usize {
        let _table = self.lock();
        self.procs
            .iter()
            .filter(|pcb| !pcb.inner_exclusive_access().is_available())
            .count()
    }
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

/// 把刚认领的槽位重置为一个新的 `Ready` 进程并计入 `num_procs`
///
/// 必须同时持有进程表锁和该进程自己的锁。返回同一个引用，方便链式调用。
pub fn init_proc<'a>(
    table: &mut ProcessTableInner,
    proc: &'a mut ProcessControlBlockInner,
) -> &'a mut ProcessControlBlockInner {
    proc.reset();
    table.num_procs += 1;
    proc
}
