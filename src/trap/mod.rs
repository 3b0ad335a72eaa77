//! # 陷阱处理模块
//!
//! 用户态通过 `ecall`、时钟中断或异常进入内核后，陷阱入口汇编已经把用户
//! 寄存器存进当前 hart 的活动陷阱帧（地址在 `sscratch` 中）。[`trap_handler`]
//! 按原因分发：
//!
//! - **系统调用** - `pc += 4` 跳过 `ecall`，按 `a7` 分发，结果写回 `a0`
//! - **时钟中断** - 唤醒到期的睡眠进程并调度
//! - **用户异常** - 杀死出错的进程（以 -1 退出）
//!
//! 返回的 [`Schedule`] 告诉入口代码是回到用户态还是停在空闲循环。

mod context;

#[cfg(target_arch = "riscv64")]
pub mod arch;

use log::error;

use crate::process::{ProcessManager, Schedule};
use crate::syscall::{syscall, SyscallReturn};

pub use context::{
    copy_trap_frame, TrapFrame, NUM_REGS, REG_A0, REG_A1, REG_A2, REG_A3, REG_A7, REG_FP, REG_RA,
    REG_SP,
};

/// 陷阱原因
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrapCause {
    /// 用户态 `ecall`
    UserEnvCall,
    /// S 态时钟中断
    SupervisorTimer,
    /// 其他异常，携带 `scause` 和 `stval` 原值
    Fault { scause: usize, stval: usize },
}

/// 陷阱分发
///
/// ## Arguments
///
/// * `manager` - 进程管理上下文
/// * `hart` - 陷入的 hart
/// * `cause` - 陷阱原因，RISC-V 目标上由 [`arch::read_cause`] 读出
///
/// ## Panics
///
/// 没有当前进程时收到系统调用或异常（内核自身出错）会 panic。
pub fn trap_handler(manager: &ProcessManager, hart: usize, cause: TrapCause) -> Schedule {
    match cause {
        TrapCause::UserEnvCall => {
            let (id, args) = {
                let mut frame = manager.hart(hart).trap_frame();
                frame.pc += 4;
                (frame.syscall_id(), frame.syscall_args())
            };
            match syscall(manager, hart, id, args) {
                SyscallReturn::Value(ret) => {
                    manager.hart(hart).trap_frame().set_return(ret);
                    Schedule::Resume(manager.getpid(hart))
                }
                SyscallReturn::Rescheduled(schedule) => schedule,
            }
        }
        TrapCause::SupervisorTimer => {
            #[cfg(target_arch = "riscv64")]
            crate::timer::set_next_trigger();
            manager.timer_tick(hart)
        }
        TrapCause::Fault { scause, stval } => {
            let pc = manager.hart(hart).trap_frame().pc;
            let pid = manager.getpid(hart);
            error!(
                "pid {} fault: scause = {:#x}, stval = {:#x}, pc = {:#x}, killed",
                pid, scause, stval, pc
            );
            manager.exit(hart, -1)
        }
    }
}
