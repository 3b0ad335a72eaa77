//! RISC-V 上与陷阱相关的 CSR 操作

use riscv::register::{
    scause::{self, Interrupt, Trap},
    sie, sstatus, stval,
};

use super::TrapCause;
use crate::process::{ProcessManager, Schedule};

/// 从 `scause` / `stval` 读出陷阱原因
pub fn read_cause() -> TrapCause {
    let scause = scause::read();
    match scause.cause() {
        Trap::Exception(scause::Exception::UserEnvCall) => TrapCause::UserEnvCall,
        Trap::Interrupt(Interrupt::SupervisorTimer) => TrapCause::SupervisorTimer,
        _ => TrapCause::Fault {
            scause: scause.bits(),
            stval: stval::read(),
        },
    }
}

/// 让 `sret` 返回到 U 态
pub fn set_user_mode() {
    unsafe { sstatus::set_spp(sstatus::SPP::User) };
}

/// 打开 S 态时钟中断
pub fn enable_timer_interrupt() {
    unsafe { sie::set_stimer() };
}

/// 没有可运行的进程：停在 `wfi` 上直到有中断挂起
///
/// `sstatus.SIE` 保持关闭，中断不会真正陷入，只是把 hart 叫醒。
pub fn park_hart() {
    unsafe { riscv::asm::wfi() };
}

/// 陷阱入口汇编调用的 Rust 部分
///
/// 分发完成后若没有进程可运行就停在 `wfi` 上，直到时钟中断把某个进程
/// 装回陷阱帧。
pub fn trap_entry(manager: &ProcessManager, hart: usize) {
    let mut schedule = super::trap_handler(manager, hart, read_cause());
    while schedule == Schedule::Idle {
        park_hart();
        crate::timer::set_next_trigger();
        schedule = manager.timer_tick(hart);
    }
    set_user_mode();
}
