//! # 单处理器安全单元
//!
//! 提供在单处理器环境下的共享可变数据结构，用于每个 hart 私有的状态
//! （陷阱帧、处理器描述符）。

use core::cell::{RefCell, RefMut};

/// 单处理器安全单元 (Uniprocessor Safe Cell)
///
/// `RefCell<T>` 的封装。每个 hart 只会在陷阱处理期间（中断关闭）访问属于
/// 自己的那一份数据，因此不需要真正的锁。
///
/// ## Safety
///
/// 该结构体实现了 `Sync`，需要调用者保证：
/// - 数据只被它所属的 hart 访问
/// - 访问期间中断处于关闭状态
pub struct UPSafeCell<T> {
    inner: RefCell<T>,
}

unsafe impl<T> Sync for UPSafeCell<T> {}

impl<T> UPSafeCell<T> {
    /// 创建一个新的 `UPSafeCell`
    ///
    /// ## Safety
    ///
    /// 调用者必须确保只在所属 hart 上、关中断时访问。
    pub unsafe fn new(value: T) -> Self {
        Self {
            inner: RefCell::new(value),
        }
    }

    /// 获取对内部数据的独占可变引用
    ///
    /// ## Panics
    ///
    /// 如果内部数据已经被借用，此方法会 panic。这意味着某条内核路径在持有
    /// 借用时重入了调度器，属于内核不变量被破坏。
    pub fn exclusive_access(&self) -> RefMut<'_, T> {
        self.inner.borrow_mut()
    }

    /// 内部数据的裸地址
    ///
    /// 地址在 `UPSafeCell` 不移动的前提下保持不变，供陷阱入口汇编直接访问。
    pub fn as_ptr(&self) -> *mut T {
        self.inner.as_ptr()
    }
}
