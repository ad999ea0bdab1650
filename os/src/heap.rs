//! 内核堆
//!
//! 静态数组作为 talc 的堆区，第一次分配时由 [`ClaimOnOom`] 接管。
//! 分配器锁使用屏蔽中断的 [`sync::RawSpinLock`]，因此必须先注册 `sync::ArchOps`。

use talc::{ClaimOnOom, Span, Talc, Talck};

/// 堆大小
pub const HEAP_SIZE: usize = 1 << 20;

static mut ARENA: [u8; HEAP_SIZE] = [0; HEAP_SIZE];

#[global_allocator]
static ALLOCATOR: Talck<sync::RawSpinLock, ClaimOnOom> =
    // SAFETY: ARENA 只交给分配器使用
    Talc::new(unsafe { ClaimOnOom::new(Span::from_array(&raw mut ARENA)) }).lock();

/// 堆区起始地址
pub fn base() -> usize {
    (&raw const ARENA) as usize
}
