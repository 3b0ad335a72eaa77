//! # 同步原语
//!
//! - [`SpinLock`] - 忙等待自旋锁，`lock()` 获取、guard 析构时释放；用于进程表锁
//!   与每个进程自己的锁
//! - [`UPSafeCell`] - 单处理器安全单元，用于 hart 私有状态

mod up;

pub use up::UPSafeCell;

pub use spin::{Mutex as SpinLock, MutexGuard as SpinLockGuard};
