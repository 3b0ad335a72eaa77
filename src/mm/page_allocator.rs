//! # 页分配器
//!
//! 进程的用户栈和内核栈各占一页，由外部页分配器提供。本模块定义该协作者的
//! 接口 [`PageAllocator`]、页句柄 [`PhysPage`]，以及一个基于栈式回收的简单实现
//! [`StackPageAllocator`]。
//!
//! ## 分配策略
//!
//! ```text
//! [start ─────────── current ─────────── end)
//!   已分配过的页          从未分配的页
//! recycled: 回收的页，优先复用（LIFO）
//! ```

use alloc::vec::Vec;
use core::fmt::{self, Debug, Formatter};

use crate::config::PAGE_SIZE;
use crate::sync::SpinLock;

/// 一个物理页
///
/// 只记录页的起始地址，不拥有其内存：页的生命周期由持有它的进程控制块
/// 手动管理，在 `exit` 时交还给分配器。
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PhysPage(usize);

impl PhysPage {
    /// 由页对齐的地址构造
    ///
    /// ## Panics
    ///
    /// 地址未按 [`PAGE_SIZE`] 对齐时 panic。
    pub fn from_base(base: usize) -> Self {
        assert_eq!(base % PAGE_SIZE, 0, "page base {:#x} is not aligned", base);
        Self(base)
    }

    /// 页的最低地址
    pub fn base(&self) -> usize {
        self.0
    }

    /// 页的末尾（不含），即栈顶
    pub fn top(&self) -> usize {
        self.0 + PAGE_SIZE
    }

    /// `addr` 是否落在 `[base, top]` 内
    ///
    /// 栈指针可以等于 `top`（空栈），因此上界包含在内。
    pub fn contains(&self, addr: usize) -> bool {
        addr >= self.base() && addr <= self.top()
    }

    /// 把 `addr` 从 `from` 页中的偏移平移到本页中
    ///
    /// 不在 `from` 内的地址原样返回。fork 时用于重定位子进程的 sp / fp。
    pub fn rebase(&self, from: &PhysPage, addr: usize) -> usize {
        if from.contains(addr) {
            self.base() + (addr - from.base())
        } else {
            addr
        }
    }

    /// 把 `src` 页的全部内容复制到本页
    ///
    /// ## Safety
    ///
    /// 两个页都必须是分配器分配出来、当前有效且互不重叠的页。
    pub unsafe fn copy_from(&self, src: &PhysPage) {
        core::ptr::copy_nonoverlapping(src.base() as *const u8, self.base() as *mut u8, PAGE_SIZE);
    }

    /// 把整页清零
    ///
    /// ## Safety
    ///
    /// 页必须有效且无人正在使用。
    pub unsafe fn zero(&self) {
        core::ptr::write_bytes(self.base() as *mut u8, 0, PAGE_SIZE);
    }

    /// 以字节切片的形式访问整页
    ///
    /// ## Safety
    ///
    /// 页必须有效，且在返回的切片存活期间没有其他引用。
    pub unsafe fn bytes_mut(&self) -> &'static mut [u8] {
        core::slice::from_raw_parts_mut(self.base() as *mut u8, PAGE_SIZE)
    }
}

impl Debug for PhysPage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("PhysPage({:#x})", self.0))
    }
}

/// 页分配器接口
pub trait PageAllocator: Send + Sync {
    /// 分配一页，耗尽时返回 `None`
    fn allocate_page(&self) -> Option<PhysPage>;

    /// 归还一页
    fn release_page(&self, page: PhysPage);
}

struct StackPageAllocatorInner {
    current: usize,
    end: usize,
    recycled: Vec<usize>,
}

/// 栈式页分配器
///
/// 管理 `[start, end)` 范围内的页。新分配的页会被清零。
pub struct StackPageAllocator {
    inner: SpinLock<StackPageAllocatorInner>,
}

impl StackPageAllocator {
    /// 在 `[start, end)` 上创建分配器，两端都会向内对齐到页边界
    ///
    /// ## Safety
    ///
    /// 该范围必须是可读写、且不被其他任何东西使用的内存。
    pub unsafe fn new(start: usize, end: usize) -> Self {
        let start = (start + PAGE_SIZE - 1) / PAGE_SIZE * PAGE_SIZE;
        let end = end / PAGE_SIZE * PAGE_SIZE;
        Self {
            inner: SpinLock::new(StackPageAllocatorInner {
                current: start,
                end: end.max(start),
                recycled: Vec::new(),
            }),
        }
    }

    /// 当前还能分配出去的页数
    pub fn free_pages(&self) -> usize {
        let inner = self.inner.lock();
        (inner.end - inner.current) / PAGE_SIZE + inner.recycled.len()
    }
}

impl PageAllocator for StackPageAllocator {
    fn allocate_page(&self) -> Option<PhysPage> {
        let mut inner = self.inner.lock();
        let base = if let Some(base) = inner.recycled.pop() {
            base
        } else if inner.current == inner.end {
            return None;
        } else {
            inner.current += PAGE_SIZE;
            inner.current - PAGE_SIZE
        };
        drop(inner);
        let page = PhysPage::from_base(base);
        unsafe { page.zero() };
        Some(page)
    }

    fn release_page(&self, page: PhysPage) {
        let mut inner = self.inner.lock();
        let base = page.base();
        if base >= inner.current || inner.recycled.contains(&base) {
            panic!("{:?} has not been allocated", page);
        }
        inner.recycled.push(base);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::boxed::Box;

    #[repr(C, align(4096))]
    struct RawPage([u8; PAGE_SIZE]);

    fn pool(pages: usize) -> StackPageAllocator {
        let memory: Vec<RawPage> = (0..pages).map(|_| RawPage([0xaa; PAGE_SIZE])).collect();
        let memory = Box::leak(memory.into_boxed_slice());
        let start = memory.as_mut_ptr() as usize;
        unsafe { StackPageAllocator::new(start, start + pages * PAGE_SIZE) }
    }

    #[test]
    fn allocates_until_exhausted_then_reuses() {
        let allocator = pool(3);
        let pages: Vec<PhysPage> = (0..3).map(|_| allocator.allocate_page().unwrap()).collect();
        assert!(allocator.allocate_page().is_none());
        allocator.release_page(pages[1]);
        assert_eq!(allocator.free_pages(), 1);
        assert_eq!(allocator.allocate_page(), Some(pages[1]));
    }

    #[test]
    fn new_pages_are_zeroed() {
        let allocator = pool(1);
        let page = allocator.allocate_page().unwrap();
        assert!(unsafe { page.bytes_mut() }.iter().all(|b| *b == 0));
    }

    #[test]
    #[should_panic]
    fn double_release_panics() {
        let allocator = pool(1);
        let page = allocator.allocate_page().unwrap();
        allocator.release_page(page);
        allocator.release_page(page);
    }

    #[test]
    fn rebase_keeps_offset() {
        let from = PhysPage::from_base(0x1000);
        let to = PhysPage::from_base(0x8000);
        assert_eq!(to.rebase(&from, 0x1ff0), 0x8ff0);
        assert_eq!(to.rebase(&from, 0x2000), 0x9000);
        assert_eq!(to.rebase(&from, 0x42), 0x42);
    }
}
