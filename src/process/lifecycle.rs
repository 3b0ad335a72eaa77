//! # 进程生命周期
//!
//! 创建（spawn / fork）、替换映像（execv）、退出（exit）、等待（wait）、
//! 睡眠（sleep）、让出（yield）以及时钟路径上的唤醒。
//!
//! 会让调用者离开 CPU 的操作都以一次 [`schedule_user_process`] 结束并返回
//! 其结果 [`Schedule`]；此时活动陷阱帧里已经是下一个进程的上下文，调用者
//! 不能再往 `a0` 写返回值。
//!
//! [`schedule_user_process`]: ProcessManager::schedule_user_process

use core::mem::size_of;

use log::{debug, info, trace, warn};

use crate::config::{MAX_EXEC_ARGS, PAGE_SIZE};
use crate::error::ProcError;
use crate::mm::PhysPage;
use crate::process::process::{ParentRef, Pid, ProcessStatus, WakeCondition};
use crate::process::processor::Schedule;
use crate::process::ProcessManager;
use crate::trap::{TrapFrame, REG_A0, REG_A1, REG_FP, REG_SP};

/// argv 在栈页中占用的字节数（含指针数组、字符串和对齐余量）
fn argv_footprint(argv: &[&str]) -> usize {
    let word = size_of::<usize>();
    let pointers = (argv.len() + 1) * word;
    let strings: usize = argv.iter().map(|arg| arg.len() + 1).sum();
    pointers + strings + word - 1
}

/// 按调用约定把 argv 写到 `stack` 顶部，返回 `(sp, argv_base)`
///
/// ```text
/// top ──► ┌──────────────┐
///         │ argv[argc]=0 │
///         │ argv[..]     │ ◄── argv_base (a1)
///         ├──────────────┤
///         │ "arg0\0" ... │
///         ├──────────────┤
///         │ padding      │ ◄── sp，按字长向下对齐
///         └──────────────┘
/// ```
///
/// ## Safety
///
/// `stack` 必须是调用进程自己的有效栈页，且 argv 已经放得下。
unsafe fn push_argv(stack: &PhysPage, argv: &[&str]) -> (usize, usize) {
    let word = size_of::<usize>();
    let base = stack.base();
    let bytes = stack.bytes_mut();
    let argv_base = stack.top() - (argv.len() + 1) * word;
    let slot_of = |i: usize| argv_base + i * word - base;

    let terminator = slot_of(argv.len());
    bytes[terminator..terminator + word].copy_from_slice(&0usize.to_ne_bytes());

    let mut sp = argv_base;
    for (i, arg) in argv.iter().enumerate() {
        sp -= arg.len() + 1;
        let offset = sp - base;
        bytes[offset..offset + arg.len()].copy_from_slice(arg.as_bytes());
        bytes[offset + arg.len()] = 0;
        let pointer = slot_of(i);
        bytes[pointer..pointer + word].copy_from_slice(&sp.to_ne_bytes());
    }
    sp -= sp % word;
    (sp, argv_base)
}

impl ProcessManager {
    /// 分配用户栈页和内核栈页，任何一页失败都不留下半成品
    fn alloc_stacks(&self) -> Result<(PhysPage, PhysPage), ProcError> {
        let stack = self.pages.allocate_page().ok_or(ProcError::OutOfMemory)?;
        match self.pages.allocate_page() {
            Some(kstack) => Ok((stack, kstack)),
            None => {
                self.pages.release_page(stack);
                Err(ProcError::OutOfMemory)
            }
        }
    }

    /// 从程序注册表创建一个没有父进程的新进程
    ///
    /// 启动时用它放入第一个进程。新进程处于 `Ready`，从入口开始执行，
    /// sp 指向自己的用户栈顶。
    pub fn spawn(&self, name: &str) -> Result<Pid, ProcError> {
        let program = self
            .programs
            .find_user_program(name)
            .ok_or(ProcError::ProgramNotFound)?;
        let (stack, kstack) = self.alloc_stacks()?;

        let mut table = self.table.lock();
        let (slot, mut proc) = match self.table.alloc_process(&mut table) {
            Ok(claimed) => claimed,
            Err(err) => {
                self.pages.release_page(stack);
                self.pages.release_page(kstack);
                warn!("spawn {}: {}", name, err);
                return Err(err);
            }
        };
        let pid = table.alloc_pid();
        proc.pid = pid;
        proc.name = program.name;
        proc.trap = TrapFrame::app_init_context(program.entry_point, stack.top());
        proc.stack_page = Some(stack);
        proc.kstack_page = Some(kstack);
        proc.kernel_stack = kstack.top();
        info!("spawned {} as pid {} in slot {}", program.name, pid, slot);
        Ok(pid)
    }

    /// 复制当前进程
    ///
    /// 子进程得到父进程陷阱帧和用户栈的深拷贝（sp / fp 平移到新栈页）、
    /// 新的内核栈、共享句柄的文件描述符表以及新 pid，处于 `Ready`。
    /// 子进程的 `a0` 为 0，父进程的返回值为子进程 pid。
    ///
    /// 进程表满或页分配失败时返回错误，不改变任何状态。
    pub fn fork(&self, hart: usize) -> Result<Pid, ProcError> {
        let parent_slot = self.myproc(hart);
        let (stack, kstack) = self.alloc_stacks()?;

        let mut table = self.table.lock();
        let (child_slot, mut child) = match self.table.alloc_process(&mut table) {
            Ok(claimed) => claimed,
            Err(err) => {
                self.pages.release_page(stack);
                self.pages.release_page(kstack);
                return Err(err);
            }
        };
        let child_pid = table.alloc_pid();

        let mut live = self.hart(hart).trap_frame();
        let mut parent = self.table.proc(parent_slot).inner_exclusive_access();
        let parent_stack = parent
            .stack_page
            .unwrap_or_else(|| panic!("pid {} has no user stack", parent.pid));

        parent.trap = *live;
        child.trap = *live;
        unsafe { stack.copy_from(&parent_stack) };
        for reg in [REG_SP, REG_FP] {
            let rebased = stack.rebase(&parent_stack, child.trap.reg(reg));
            child.trap.set_reg(reg, rebased);
        }
        child.trap.set_return(0);

        child.pid = child_pid;
        child.name = parent.name;
        child.parent = Some(ParentRef {
            pid: parent.pid,
            slot: parent_slot,
        });
        child.stack_page = Some(stack);
        child.kstack_page = Some(kstack);
        child.kernel_stack = kstack.top();
        child.fd_table = parent.fd_table.duplicate();

        live.set_return(child_pid.0 as isize);
        parent.trap.set_return(child_pid.0 as isize);
        info!(
            "pid {} forked pid {} (slot {} -> {})",
            parent.pid, child_pid, parent_slot, child_slot
        );
        Ok(child_pid)
    }

    /// 结束当前进程并调度下一个
    ///
    /// 归还两页栈、关闭所有文件描述符、槽位变回 `Available`。父进程若正睡在
    /// `wait` 中则被唤醒，其保存的 `a0` 设为本进程的 pid。`code` 只记录到日志。
    pub fn exit(&self, hart: usize, code: i32) -> Schedule {
        let slot = self.myproc(hart);
        {
            let mut table = self.table.lock();
            let mut proc = self.table.proc(slot).inner_exclusive_access();
            if let Some(page) = proc.stack_page.take() {
                self.pages.release_page(page);
            }
            if let Some(page) = proc.kstack_page.take() {
                self.pages.release_page(page);
            }
            proc.fd_table.close_all(self.fs.as_ref());
            proc.process_status = ProcessStatus::Available;
            table.num_procs -= 1;
            let pid = proc.pid;
            let parent = proc.parent.take();
            drop(proc);
            info!("pid {} exited with code {}", pid, code);

            if let Some(parent_ref) = parent {
                let mut parent = self.table.proc(parent_ref.slot).inner_exclusive_access();
                let waiting = parent.pid == parent_ref.pid
                    && parent.status() == ProcessStatus::Sleeping(WakeCondition::ChildExit);
                if waiting {
                    parent.process_status = ProcessStatus::Ready;
                    parent.trap.set_return(pid.0 as isize);
                    debug!("woke pid {} waiting for pid {}", parent.pid, pid);
                }
            }
        }
        self.schedule_user_process(hart)
    }

    /// 用注册表中的程序替换当前进程的映像
    ///
    /// 原地改写调用者的陷阱帧：pc = ra = 入口，argv 放在自己现有的用户栈顶，
    /// `a0` = argc，`a1` = argv。pid、父进程和打开的文件保持不变。
    /// 成功时返回 argc。
    ///
    /// 程序不存在或 argv 放不进栈页时返回错误，调用者不受影响。
    pub fn execv(&self, hart: usize, filename: &str, argv: &[&str]) -> Result<usize, ProcError> {
        let program = self
            .programs
            .find_user_program(filename)
            .ok_or(ProcError::ProgramNotFound)?;
        if argv.len() > MAX_EXEC_ARGS || argv_footprint(argv) > PAGE_SIZE {
            return Err(ProcError::ArgumentsTooLong);
        }

        let slot = self.myproc(hart);
        let mut proc = self.table.proc(slot).inner_exclusive_access();
        let stack = proc
            .stack_page
            .unwrap_or_else(|| panic!("pid {} has no user stack", proc.pid));
        let (sp, argv_base) = unsafe { push_argv(&stack, argv) };

        let mut frame = TrapFrame::app_init_context(program.entry_point, sp);
        frame.set_reg(REG_A0, argv.len());
        frame.set_reg(REG_A1, argv_base);
        proc.trap = frame;
        proc.name = program.name;
        *self.hart(hart).trap_frame() = frame;
        info!("pid {} exec {} with {} args", proc.pid, program.name, argv.len());
        Ok(argv.len())
    }

    /// 等待任意一个子进程退出
    ///
    /// 没有存活的子进程时立即返回 [`ProcError::NoChildren`]，状态不变。
    /// 否则进入只能被子进程退出唤醒的睡眠并调度；被唤醒时 `a0` 已经是
    /// 退出子进程的 pid。
    pub fn wait(&self, hart: usize) -> Result<Schedule, ProcError> {
        let slot = self.myproc(hart);
        {
            let _table = self.table.lock();
            let me = ParentRef {
                pid: self.table.proc(slot).inner_exclusive_access().pid,
                slot,
            };
            let has_child = self
                .table
                .procs()
                .iter()
                .any(|pcb| pcb.inner_exclusive_access().is_child_of(me));
            if !has_child {
                return Err(ProcError::NoChildren);
            }
            let mut proc = self.table.proc(slot).inner_exclusive_access();
            proc.process_status = ProcessStatus::Sleeping(WakeCondition::ChildExit);
            debug!("pid {} waiting for a child", me.pid);
        }
        Ok(self.schedule_user_process(hart))
    }

    /// 睡眠 `ms` 毫秒
    ///
    /// 到期时间为 `now + ms`，之后由时钟路径唤醒；醒来时返回 0。
    pub fn sleep(&self, hart: usize, ms: u64) -> Schedule {
        let slot = self.myproc(hart);
        let deadline = self.clock.now_ms().saturating_add(ms);
        self.hart(hart).trap_frame().set_return(0);
        {
            let _table = self.table.lock();
            let mut proc = self.table.proc(slot).inner_exclusive_access();
            proc.process_status = ProcessStatus::Sleeping(WakeCondition::At(deadline));
            trace!("pid {} sleeps until {}", proc.pid, deadline);
        }
        self.schedule_user_process(hart)
    }

    /// 主动让出 CPU
    pub fn yield_now(&self, hart: usize) -> Schedule {
        self.myproc(hart);
        self.hart(hart).trap_frame().set_return(0);
        self.schedule_user_process(hart)
    }

    /// 唤醒所有到期的定时睡眠进程，返回唤醒的个数
    ///
    /// 等待子进程的睡眠不受影响。
    pub fn wake_sleepers(&self) -> usize {
        let now = self.clock.now_ms();
        let _table = self.table.lock();
        let mut woken = 0;
        for pcb in self.table.procs() {
            let mut proc = pcb.inner_exclusive_access();
            if proc.should_wake_up(now) {
                proc.process_status = ProcessStatus::Ready;
                woken += 1;
                trace!("pid {} woke at {}", proc.pid, now);
            }
        }
        woken
    }

    /// 时钟中断：先唤醒到期的睡眠进程，再调度
    pub fn timer_tick(&self, hart: usize) -> Schedule {
        self.wake_sleepers();
        self.schedule_user_process(hart)
    }

    pub fn getpid(&self, hart: usize) -> Pid {
        let slot = self.myproc(hart);
        self.table.proc(slot).inner_exclusive_access().pid
    }
}
