//! # 处理器管理模块
//!
//! 每个 hart 的私有状态以及把进程映射到 CPU 上的调度器。
//!
//! ## 核心组件
//!
//! - [`Processor`] - 处理器描述符：当前映射在 CPU 上的槽位和正在使用的内核栈
//! - [`Hart`] - 一个 hart 的处理器描述符加上它唯一的活动陷阱帧
//! - [`Schedule`] - 一次调度的结果
//! - [`ProcessManager::schedule_user_process`] - 唯一改变 CPU 上进程的入口
//!
//! ## 上下文切换
//!
//! 本内核没有内核线程之间的 `__switch`：所有用户上下文都经过同一个陷阱帧。
//! 切换进程就是把陷阱帧的内容在 PCB 之间搬运。
//!
//! ```text
//! Process A ──trap──► live frame ──save──► A.trap
//!                                           │
//!                          B.trap ──load──► live frame ──sret──► Process B
//! ```
//!
//! 没有任何进程可以运行时处理器进入空闲状态：`is_idle` 置位，陷阱帧里的内容
//! 不属于任何进程，下一次陷阱到来时不会被保存。

use core::cell::RefMut;
use core::sync::atomic::{AtomicBool, Ordering};

use log::trace;

use crate::process::process::{Pid, ProcessStatus};
use crate::process::ProcessManager;
use crate::sync::UPSafeCell;
use crate::trap::{copy_trap_frame, TrapFrame};

/// 处理器描述符
pub struct Processor {
    /// 当前映射在 CPU 上的槽位（不拥有）
    ///
    /// - `Some(slot)`: 该槽位的上下文正在陷阱帧中
    /// - `None`: 处理器空闲
    current: Option<usize>,

    /// 当前使用的内核栈指针，是当前进程 `kernel_stack` 的镜像；空闲时为启动栈
    kernel_stack: usize,

    /// 启动时的内核栈，空闲时回落到它
    boot_kernel_stack: usize,
}

impl Processor {
    pub fn new(boot_kernel_stack: usize) -> Self {
        Self {
            current: None,
            kernel_stack: boot_kernel_stack,
            boot_kernel_stack,
        }
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }

    pub fn kernel_stack(&self) -> usize {
        self.kernel_stack
    }

    fn map(&mut self, slot: usize, kernel_stack: usize) {
        self.current = Some(slot);
        self.kernel_stack = kernel_stack;
    }

    fn unmap(&mut self) {
        self.current = None;
        self.kernel_stack = self.boot_kernel_stack;
    }
}

/// 一个 hart 的私有状态
///
/// 陷阱帧是该 hart 上唯一的活动上下文，陷阱入口汇编通过 `sscratch`
/// 找到它，因此它在 [`ProcessManager`] 内的地址必须保持不变。
pub struct Hart {
    processor: UPSafeCell<Processor>,
    trap_frame: UPSafeCell<TrapFrame>,
    bound: AtomicBool,
}

impl Hart {
    pub(crate) fn new(boot_kernel_stack: usize) -> Self {
        unsafe {
            Self {
                processor: UPSafeCell::new(Processor::new(boot_kernel_stack)),
                trap_frame: UPSafeCell::new(TrapFrame::zero_init()),
                bound: AtomicBool::new(false),
            }
        }
    }

    pub fn processor(&self) -> RefMut<'_, Processor> {
        self.processor.exclusive_access()
    }

    pub fn trap_frame(&self) -> RefMut<'_, TrapFrame> {
        self.trap_frame.exclusive_access()
    }

    /// 陷阱帧的裸地址，写入 `sscratch`
    pub fn trap_frame_ptr(&self) -> *mut TrapFrame {
        self.trap_frame.as_ptr()
    }

    pub fn is_bound(&self) -> bool {
        self.bound.load(Ordering::Acquire)
    }
}

/// 调度结果
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Schedule {
    /// 陷阱返回后运行该进程
    Resume(Pid),
    /// 没有可运行的进程，hart 应当停在空闲循环里等待中断
    Idle,
}

impl ProcessManager {
    /// 把 `hart` 的陷阱帧交给陷阱入口使用
    ///
    /// 启动时每个 hart 恰好调用一次，必须先于任何调度。RISC-V 目标上把陷阱帧
    /// 地址写入 `sscratch`，并打开时钟中断、设好第一次触发。
    ///
    /// ## Panics
    ///
    /// 同一个 hart 重复绑定时 panic。
    pub fn init_global_trap_frame(&'static self, hart: usize) {
        let hart = self.hart(hart);
        assert!(
            !hart.bound.swap(true, Ordering::AcqRel),
            "trap frame bound twice"
        );
        #[cfg(target_arch = "riscv64")]
        {
            unsafe { riscv::register::sscratch::write(hart.trap_frame_ptr() as usize) };
            crate::trap::arch::enable_timer_interrupt();
            crate::timer::set_next_trigger();
        }
    }

    /// 选出下一个进程并把它装入 `hart` 的陷阱帧
    ///
    /// 调用前不能持有进程表锁或任何进程的锁。
    ///
    /// 1. 当前映射的进程（若仍存在）是换出者
    /// 2. 在进程表锁下调用 `find_ready_proc`
    /// 3. 胜者不是换出者时：活动陷阱帧存回换出者（`Running` 变为 `Ready`，
    ///    睡眠的保持睡眠），胜者的上下文装入活动陷阱帧
    /// 4. 胜者标为 `Running`，更新处理器描述符
    ///
    /// 找不到可运行进程时保存换出者的上下文，置 `is_idle` 并返回
    /// [`Schedule::Idle`]。
    ///
    /// ## Panics
    ///
    /// 陷阱帧尚未通过 [`init_global_trap_frame`](Self::init_global_trap_frame) 绑定时 panic。
    pub fn schedule_user_process(&self, hart: usize) -> Schedule {
        let hart = self.hart(hart);
        assert!(hart.is_bound(), "scheduling before the trap frame is bound");

        let mut table = self.table.lock();
        let mut processor = hart.processor();
        let mut frame = hart.trap_frame();

        let outgoing = match processor.current() {
            Some(slot) if !table.is_idle => {
                let available = self.table.proc(slot).inner_exclusive_access().is_available();
                (!available).then_some(slot)
            }
            _ => None,
        };

        if table.num_procs == 0 {
            table.is_idle = true;
            processor.unmap();
            trace!("no processes, idle");
            return Schedule::Idle;
        }

        let Some(winner) = self.table.find_ready_proc(&mut table) else {
            if let Some(slot) = outgoing {
                self.save_outgoing(slot, &frame);
            }
            table.is_idle = true;
            processor.unmap();
            trace!("nothing ready, idle");
            return Schedule::Idle;
        };

        if outgoing != Some(winner) {
            if let Some(slot) = outgoing {
                self.save_outgoing(slot, &frame);
            }
        }

        let mut next = self.table.proc(winner).inner_exclusive_access();
        if outgoing != Some(winner) {
            copy_trap_frame(&mut frame, &next.trap);
        }
        next.process_status = ProcessStatus::Running;
        processor.map(winner, next.kernel_stack);
        table.is_idle = false;
        trace!("slot {} (pid {}) scheduled", winner, next.pid);
        Schedule::Resume(next.pid)
    }

    fn save_outgoing(&self, slot: usize, frame: &TrapFrame) {
        let mut prev = self.table.proc(slot).inner_exclusive_access();
        copy_trap_frame(&mut prev.trap, frame);
        if prev.process_status == ProcessStatus::Running {
            prev.process_status = ProcessStatus::Ready;
        }
    }
}
