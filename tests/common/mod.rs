//! 集成测试共用的协作者替身和启动辅助函数
#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use kproc::config::PAGE_SIZE;
use kproc::fs::{File, FileHandle, FileSystem, OpenFlags};
use kproc::loader::{StaticProgramRegistry, UserProgram};
use kproc::mm::StackPageAllocator;
use kproc::process::ProcessManager;
use kproc::syscall::SyscallReturn;
use kproc::trap::{trap_handler, REG_A0, REG_A1, REG_A2, REG_A3, REG_A7};
use kproc::{FsError, Schedule, TrapCause};

pub const HART: usize = 0;
pub const BOOT_STACK: usize = 0xdead_0000;

pub const INIT_ENTRY: usize = 0x8040_0000;
pub const SH_ENTRY: usize = 0x8041_0000;
pub const HELLO_ENTRY: usize = 0x8042_0000;

pub static PROGRAMS: [UserProgram; 3] = [
    UserProgram { name: "init", entry_point: INIT_ENTRY },
    UserProgram { name: "sh", entry_point: SH_ENTRY },
    UserProgram { name: "hello", entry_point: HELLO_ENTRY },
];

pub static FILES: [(&str, &[u8]); 2] = [
    ("readme", b"hello kernel"),
    ("empty", b""),
];

#[repr(C, align(4096))]
struct RawPage([u8; PAGE_SIZE]);

/// 由泄漏的主机内存支撑的页池
pub fn page_pool(pages: usize) -> Arc<StackPageAllocator> {
    let memory: Vec<RawPage> = (0..pages).map(|_| RawPage([0; PAGE_SIZE])).collect();
    let memory = Box::leak(memory.into_boxed_slice());
    let start = memory.as_mut_ptr() as usize;
    Arc::new(unsafe { StackPageAllocator::new(start, start + pages * PAGE_SIZE) })
}

/// 手动推进的时钟
#[derive(Default)]
pub struct ManualClock(AtomicU64);

impl ManualClock {
    pub fn set(&self, ms: u64) {
        self.0.store(ms, Ordering::SeqCst);
    }
}

impl kproc::timer::Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// 内存中的只读文件，读位置在共享同一句柄的进程之间共享
pub struct MockFile {
    data: &'static [u8],
    pos: AtomicUsize,
    readable: bool,
}

impl File for MockFile {
    fn read(&self, buf: &mut [u8]) -> Result<usize, FsError> {
        let pos = self.pos.load(Ordering::SeqCst);
        let n = buf.len().min(self.data.len() - pos);
        buf[..n].copy_from_slice(&self.data[pos..pos + n]);
        self.pos.store(pos + n, Ordering::SeqCst);
        Ok(n)
    }

    fn readable(&self) -> bool {
        self.readable
    }

    fn writable(&self) -> bool {
        !self.readable
    }
}

/// 记录打开与关闭次数的文件系统
#[derive(Default)]
pub struct MockFs {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
}

impl MockFs {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

impl FileSystem for MockFs {
    fn open(&self, path: &str, flags: OpenFlags) -> Result<FileHandle, FsError> {
        let &(_, data) = FILES
            .iter()
            .find(|(name, _)| *name == path)
            .ok_or(FsError::NotFound)?;
        self.opened.fetch_add(1, Ordering::SeqCst);
        let (readable, _) = flags.read_write();
        Ok(Arc::new(MockFile {
            data,
            pos: AtomicUsize::new(0),
            readable,
        }))
    }

    fn close(&self, file: FileHandle) {
        self.closed.fetch_add(1, Ordering::SeqCst);
        drop(file);
    }
}

pub struct Kernel {
    pub pm: &'static ProcessManager,
    pub pages: Arc<StackPageAllocator>,
    pub fs: Arc<MockFs>,
    pub clock: Arc<ManualClock>,
}

/// 构造进程管理器并绑定 hart 0 的陷阱帧，进程表为空
pub fn boot(pages: usize) -> Kernel {
    kproc::log::init();
    let pages = page_pool(pages);
    let fs = Arc::new(MockFs::default());
    let clock = Arc::new(ManualClock::default());
    let pm: &'static ProcessManager = Box::leak(Box::new(ProcessManager::new(
        BOOT_STACK,
        pages.clone(),
        fs.clone(),
        clock.clone(),
        Arc::new(StaticProgramRegistry::new(&PROGRAMS)),
    )));
    pm.init_global_trap_frame(HART);
    Kernel { pm, pages, fs, clock }
}

/// 启动并让 `init` 运行起来
pub fn boot_with_init(pages: usize) -> Kernel {
    let kernel = boot(pages);
    kernel.pm.spawn("init").unwrap();
    assert!(matches!(kernel.schedule(), Schedule::Resume(_)));
    kernel
}

impl Kernel {
    pub fn schedule(&self) -> Schedule {
        self.pm.schedule_user_process(HART)
    }

    pub fn tick(&self) -> Schedule {
        trap_handler(self.pm, HART, TrapCause::SupervisorTimer)
    }

    /// 当前进程执行一次 `ecall`
    pub fn ecall(&self, id: usize, args: [usize; 4]) -> Schedule {
        {
            let mut frame = self.pm.hart(HART).trap_frame();
            frame.set_reg(REG_A7, id);
            for (reg, arg) in [REG_A0, REG_A1, REG_A2, REG_A3].into_iter().zip(args) {
                frame.set_reg(reg, arg);
            }
        }
        trap_handler(self.pm, HART, TrapCause::UserEnvCall)
    }

    /// 直接调用分发器，不经过陷阱处理
    pub fn raw_syscall(&self, id: usize, args: [usize; 4]) -> SyscallReturn {
        kproc::syscall::syscall(self.pm, HART, id, args)
    }

    /// 活动陷阱帧中的 `a0`
    pub fn a0(&self) -> isize {
        self.pm.hart(HART).trap_frame().reg(REG_A0) as isize
    }

    pub fn pc(&self) -> usize {
        self.pm.hart(HART).trap_frame().pc
    }

    pub fn free_pages(&self) -> usize {
        self.pages.free_pages()
    }

    pub fn current_slot(&self) -> Option<usize> {
        self.pm.current_proc(HART)
    }
}
