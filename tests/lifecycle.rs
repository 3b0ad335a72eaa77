mod common;

use common::*;
use kproc::config::{MAX_PROCS, PAGE_SIZE};
use kproc::syscall::{
    SYSCALL_EXEC, SYSCALL_EXIT, SYSCALL_FORK, SYSCALL_SLEEP, SYSCALL_WAIT, SYSCALL_YIELD,
};
use kproc::trap::{REG_A0, REG_A1, REG_FP, REG_RA, REG_SP};
use kproc::{ParentRef, Pid, ProcessStatus, Schedule, TrapCause, WakeCondition};

fn status(kernel: &Kernel, slot: usize) -> ProcessStatus {
    kernel.pm.table().proc(slot).inner_exclusive_access().status()
}

#[test]
fn fork_copies_frame_and_stack() {
    let kernel = boot_with_init(8);
    let parent_stack = kernel.pm.table().proc(0).inner_exclusive_access().stack_page.unwrap();
    {
        let mut frame = kernel.pm.hart(HART).trap_frame();
        frame.set_reg(REG_SP, parent_stack.top() - 64);
        frame.set_reg(REG_FP, parent_stack.top() - 32);
        frame.set_reg(20, 0x1234);
    }
    unsafe { parent_stack.bytes_mut()[PAGE_SIZE - 64] = 0x5a };

    assert_eq!(kernel.ecall(SYSCALL_FORK, [0; 4]), Schedule::Resume(Pid(0)));
    assert_eq!(kernel.a0(), 1);
    assert_eq!(kernel.pm.num_procs(), 2);

    let parent_frame = *kernel.pm.hart(HART).trap_frame();
    let child = kernel.pm.table().proc(1).inner_exclusive_access();
    let child_stack = child.stack_page.unwrap();
    assert_ne!(child_stack, parent_stack);
    assert_eq!(child.pid, Pid(1));
    assert_eq!(child.parent, Some(ParentRef { pid: Pid(0), slot: 0 }));
    assert_eq!(child.status(), ProcessStatus::Ready);
    assert_eq!(child.trap.pc, INIT_ENTRY + 4);
    assert_eq!(child.trap.reg(REG_A0), 0);
    assert_eq!(child.trap.reg(REG_SP), child_stack.top() - 64);
    assert_eq!(child.trap.reg(REG_FP), child_stack.top() - 32);
    assert_eq!(child.trap.reg(20), 0x1234);
    assert_eq!(child.trap.reg(REG_RA), parent_frame.reg(REG_RA));
    assert_eq!(unsafe { child_stack.bytes_mut() }[PAGE_SIZE - 64], 0x5a);
    assert_eq!(child.kernel_stack, child.kstack_page.unwrap().top());
    assert_eq!(child.name, "init");
}

#[test]
fn forked_child_sees_zero() {
    let kernel = boot_with_init(8);
    kernel.ecall(SYSCALL_FORK, [0; 4]);
    assert_eq!(kernel.tick(), Schedule::Resume(Pid(1)));
    assert_eq!(kernel.a0(), 0);
    assert_eq!(kernel.pc(), INIT_ENTRY + 4);
    assert_eq!(status(&kernel, 0), ProcessStatus::Ready);
}

#[test]
fn exit_returns_both_pages() {
    let kernel = boot_with_init(8);
    assert_eq!(kernel.free_pages(), 6);
    kernel.ecall(SYSCALL_FORK, [0; 4]);
    assert_eq!(kernel.free_pages(), 4);
    kernel.tick();
    assert_eq!(kernel.ecall(SYSCALL_EXIT, [3, 0, 0, 0]), Schedule::Resume(Pid(0)));
    assert_eq!(kernel.free_pages(), 6);
    assert_eq!(kernel.pm.num_procs(), 1);
    assert!(status(&kernel, 1).is_available());
}

#[test]
fn fork_exit_cycles_do_not_leak() {
    let kernel = boot_with_init(6);
    for round in 1..=100u32 {
        kernel.ecall(SYSCALL_FORK, [0; 4]);
        assert_eq!(kernel.a0(), round as isize);
        assert_eq!(kernel.tick(), Schedule::Resume(Pid(round)));
        assert_eq!(kernel.ecall(SYSCALL_EXIT, [0; 4]), Schedule::Resume(Pid(0)));
        assert_eq!(kernel.pm.num_procs(), 1);
        assert_eq!(kernel.free_pages(), 4);
    }
}

#[test]
fn fork_fails_when_table_is_full() {
    let kernel = boot_with_init(2 * MAX_PROCS + 4);
    for _ in 1..MAX_PROCS {
        kernel.ecall(SYSCALL_FORK, [0; 4]);
        assert!(kernel.a0() > 0);
    }
    let free = kernel.free_pages();
    kernel.ecall(SYSCALL_FORK, [0; 4]);
    assert_eq!(kernel.a0(), -11);
    assert_eq!(kernel.free_pages(), free);
    assert_eq!(kernel.pm.num_procs(), MAX_PROCS);
    assert_eq!(kernel.pm.table().count_live(), MAX_PROCS);
}

#[test]
fn fork_fails_without_memory() {
    let kernel = boot_with_init(3);
    kernel.ecall(SYSCALL_FORK, [0; 4]);
    assert_eq!(kernel.a0(), -12);
    assert_eq!(kernel.free_pages(), 1);
    assert_eq!(kernel.pm.num_procs(), 1);
}

#[test]
fn wait_without_children_fails_immediately() {
    let kernel = boot_with_init(4);
    assert_eq!(kernel.ecall(SYSCALL_WAIT, [0; 4]), Schedule::Resume(Pid(0)));
    assert_eq!(kernel.a0(), -10);
    assert_eq!(status(&kernel, 0), ProcessStatus::Running);
}

#[test]
fn child_exit_wakes_waiting_parent() {
    let kernel = boot_with_init(8);
    kernel.ecall(SYSCALL_FORK, [0; 4]);
    assert_eq!(kernel.ecall(SYSCALL_WAIT, [0; 4]), Schedule::Resume(Pid(1)));
    assert_eq!(status(&kernel, 0), ProcessStatus::Sleeping(WakeCondition::ChildExit));

    // 等待子进程的睡眠不会被时钟唤醒
    kernel.clock.set(u64::MAX);
    assert_eq!(kernel.tick(), Schedule::Resume(Pid(1)));
    assert_eq!(status(&kernel, 0), ProcessStatus::Sleeping(WakeCondition::ChildExit));

    assert_eq!(kernel.ecall(SYSCALL_EXIT, [7, 0, 0, 0]), Schedule::Resume(Pid(0)));
    assert_eq!(kernel.a0(), 1);
    assert_eq!(kernel.pc(), INIT_ENTRY + 8);
    assert_eq!(status(&kernel, 0), ProcessStatus::Running);
}

#[test]
fn reused_parent_slot_is_not_woken() {
    let kernel = boot_with_init(8);
    kernel.ecall(SYSCALL_FORK, [0; 4]);
    assert_eq!(kernel.ecall(SYSCALL_EXIT, [0; 4]), Schedule::Resume(Pid(1)));

    assert_eq!(kernel.pm.spawn("sh"), Ok(Pid(2)));
    {
        let _table = kernel.pm.table().lock();
        let mut sh = kernel.pm.table().proc(0).inner_exclusive_access();
        sh.process_status = ProcessStatus::Sleeping(WakeCondition::ChildExit);
    }
    assert_eq!(kernel.ecall(SYSCALL_EXIT, [0; 4]), Schedule::Idle);
    assert_eq!(status(&kernel, 0), ProcessStatus::Sleeping(WakeCondition::ChildExit));
    assert!(kernel.pm.is_idle());
}

#[test]
fn sleep_until_deadline() {
    let kernel = boot_with_init(4);
    kernel.clock.set(1000);
    assert_eq!(kernel.ecall(SYSCALL_SLEEP, [100, 0, 0, 0]), Schedule::Idle);
    {
        let proc = kernel.pm.table().proc(0).inner_exclusive_access();
        assert_eq!(proc.status(), ProcessStatus::Sleeping(WakeCondition::At(1100)));
        assert!(!proc.should_wake_up(1099));
        assert!(proc.should_wake_up(1100));
    }

    kernel.clock.set(1099);
    assert_eq!(kernel.tick(), Schedule::Idle);
    kernel.clock.set(1100);
    assert_eq!(kernel.tick(), Schedule::Resume(Pid(0)));
    assert_eq!(kernel.a0(), 0);
    assert_eq!(kernel.pc(), INIT_ENTRY + 4);
}

#[test]
fn sleeper_yields_to_others() {
    let kernel = boot(8);
    kernel.pm.spawn("init").unwrap();
    kernel.pm.spawn("sh").unwrap();
    kernel.schedule();
    assert_eq!(kernel.ecall(SYSCALL_SLEEP, [50, 0, 0, 0]), Schedule::Resume(Pid(1)));
    assert_eq!(kernel.tick(), Schedule::Resume(Pid(1)));
    kernel.clock.set(50);
    assert_eq!(kernel.tick(), Schedule::Resume(Pid(0)));
    assert_eq!(status(&kernel, 1), ProcessStatus::Ready);
}

#[test]
fn yield_hands_over_and_returns_zero() {
    let kernel = boot(8);
    kernel.pm.spawn("init").unwrap();
    kernel.pm.spawn("sh").unwrap();
    kernel.schedule();
    assert_eq!(kernel.ecall(SYSCALL_YIELD, [9, 0, 0, 0]), Schedule::Resume(Pid(1)));
    assert_eq!(status(&kernel, 0), ProcessStatus::Ready);
    assert_eq!(kernel.tick(), Schedule::Resume(Pid(0)));
    assert_eq!(kernel.a0(), 0);
}

#[test]
fn exec_replaces_image_and_passes_argv() {
    let kernel = boot_with_init(4);
    let path = b"hello\0";
    let arg0 = b"hello\0";
    let arg1 = b"world\0";
    let argv = [arg0.as_ptr() as usize, arg1.as_ptr() as usize, 0];
    let stack = kernel.pm.table().proc(0).inner_exclusive_access().stack_page.unwrap();

    let schedule = kernel.ecall(
        SYSCALL_EXEC,
        [path.as_ptr() as usize, argv.as_ptr() as usize, 0, 0],
    );
    assert_eq!(schedule, Schedule::Resume(Pid(0)));
    assert_eq!(kernel.a0(), 2);
    assert_eq!(kernel.pc(), HELLO_ENTRY);

    let frame = *kernel.pm.hart(HART).trap_frame();
    let word = std::mem::size_of::<usize>();
    let argv_base = frame.reg(REG_A1);
    assert_eq!(argv_base, stack.top() - 3 * word);
    assert_eq!(frame.reg(REG_RA), HELLO_ENTRY);
    assert_eq!(frame.reg(REG_SP), frame.reg(REG_FP));
    assert_eq!(frame.reg(REG_SP) % word, 0);
    assert!(stack.contains(frame.reg(REG_SP)) && frame.reg(REG_SP) < argv_base);

    let args: Vec<String> = (0..2)
        .map(|i| unsafe {
            let ptr = *((argv_base + i * word) as *const usize) as *const std::ffi::c_char;
            std::ffi::CStr::from_ptr(ptr).to_str().unwrap().to_owned()
        })
        .collect();
    assert_eq!(args, ["hello", "world"]);
    assert_eq!(unsafe { *((argv_base + 2 * word) as *const usize) }, 0);

    let proc = kernel.pm.table().proc(0).inner_exclusive_access();
    assert_eq!(proc.pid, Pid(0));
    assert_eq!(proc.name, "hello");
    assert_eq!(proc.trap, frame);
}

#[test]
fn exec_of_unknown_program_leaves_caller_alone() {
    let kernel = boot_with_init(4);
    kernel.pm.hart(HART).trap_frame().set_reg(20, 99);
    let path = b"missing\0";
    kernel.ecall(SYSCALL_EXEC, [path.as_ptr() as usize, 0, 0, 0]);
    assert_eq!(kernel.a0(), -2);
    assert_eq!(kernel.pc(), INIT_ENTRY + 4);
    assert_eq!(kernel.pm.hart(HART).trap_frame().reg(20), 99);
    assert_eq!(kernel.pm.table().proc(0).inner_exclusive_access().name, "init");
}

#[test]
fn exec_with_oversized_argv_fails_first() {
    let kernel = boot_with_init(4);
    let args: Vec<Vec<u8>> = (0..kproc::config::MAX_EXEC_ARGS)
        .map(|_| {
            let mut arg = vec![b'a'; 200];
            arg.push(0);
            arg
        })
        .collect();
    let mut argv: Vec<usize> = args.iter().map(|arg| arg.as_ptr() as usize).collect();
    argv.push(0);
    let path = b"hello\0";
    kernel.ecall(SYSCALL_EXEC, [path.as_ptr() as usize, argv.as_ptr() as usize, 0, 0]);
    assert_eq!(kernel.a0(), -7);
    assert_eq!(kernel.pc(), INIT_ENTRY + 4);
}

#[test]
fn exec_with_one_long_argument_is_too_big() {
    let kernel = boot_with_init(4);
    let mut arg = vec![b'a'; 4000];
    arg.push(0);
    let argv = [arg.as_ptr() as usize, 0];
    let path = b"hello\0";
    kernel.ecall(SYSCALL_EXEC, [path.as_ptr() as usize, argv.as_ptr() as usize, 0, 0]);
    assert_eq!(kernel.a0(), -7);
    assert_eq!(kernel.pm.table().proc(0).inner_exclusive_access().name, "init");
}

#[test]
fn fault_kills_the_process() {
    let kernel = boot(8);
    kernel.pm.spawn("init").unwrap();
    kernel.pm.spawn("sh").unwrap();
    kernel.schedule();
    let cause = TrapCause::Fault { scause: 0xd, stval: 0 };
    assert_eq!(kproc::trap_handler(kernel.pm, HART, cause), Schedule::Resume(Pid(1)));
    assert!(status(&kernel, 0).is_available());
    assert_eq!(kernel.free_pages(), 6);
}
