//! # 内存管理
//!
//! 本内核不使用虚拟内存：进程直接使用物理页作为栈。这里只保留页分配器。

mod page_allocator;

pub use page_allocator::{PageAllocator, PhysPage, StackPageAllocator};
