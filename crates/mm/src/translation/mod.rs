//! 地址翻译机制
//!
//! 两种机制对外契约相同，启动时选定其一，由 [`crate::Mmu`] 持有：
//! - [`SoftTlb`]: 所有进程共用同一段物理窗口，切换时整页换出换入
//! - [`PageTable`]: 每个进程一棵 Sv32 两级页表，切换时只写 satp

mod page_table;
mod soft_tlb;

pub use page_table::{PTE_USER_RWX, PageTable, PteFlags};
pub use soft_tlb::SoftTlb;

use crate::address::{PageId, Paddr, Vaddr, Vpn};
use crate::arch_ops::ArchMmOps;
use crate::config::{Platform, TranslationKind};
use crate::error::PagingResult;
use crate::frame_allocator::FrameAllocator;
use uapi::Pid;

/// 翻译机制操作时可用的底层资源
pub struct MmContext<'a> {
    /// 物理页分配器
    pub frames: &'a mut FrameAllocator,
    /// 物理内存访问
    pub ops: &'a dyn ArchMmOps,
    /// 运行平台
    pub platform: Platform,
}

/// 地址翻译机制
pub trait Translation: Send {
    /// 机制种类
    fn kind(&self) -> TranslationKind;

    /// 建立内核自身的地址空间并启用
    fn init_kernel_space(&mut self, _cx: &mut MmContext<'_>) -> PagingResult<()> {
        Ok(())
    }

    /// 把 `pid` 的虚拟页 `vpn` 映射到物理页 `page`
    ///
    /// 调用前 [`crate::Mmu`] 已在分配器中记录了所有权。
    fn map(&mut self, cx: &mut MmContext<'_>, pid: Pid, vpn: Vpn, page: PageId) -> PagingResult<()>;

    /// 切换到 `pid` 的地址空间
    fn switch(&mut self, cx: &mut MmContext<'_>, pid: Pid) -> PagingResult<()>;

    /// 把 `pid` 的虚拟地址翻译为物理地址
    fn translate(&mut self, cx: &mut MmContext<'_>, pid: Pid, va: Vaddr) -> PagingResult<Paddr>;

    /// `pid` 的页已被回收，丢弃与它相关的状态
    fn release(&mut self, pid: Pid);
}
