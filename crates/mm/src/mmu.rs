//! MMU 门面
//!
//! 持有物理页分配器、硬件操作和启动时选定的翻译机制，向内核统一提供
//! `alloc / free / map / switch / translate / flush_cache`。

use alloc::boxed::Box;

use crate::address::{PageId, Paddr, Vaddr, Vpn};
use crate::arch_ops::ArchMmOps;
use crate::config::{PAGE_SIZE, Platform, TranslationKind};
use crate::error::PagingResult;
use crate::frame_allocator::FrameAllocator;
use crate::translation::{MmContext, PageTable, SoftTlb, Translation};
use uapi::Pid;

/// MMU 门面
pub struct Mmu {
    frames: FrameAllocator,
    ops: Box<dyn ArchMmOps>,
    translation: Box<dyn Translation>,
    platform: Platform,
}

impl Mmu {
    /// 以完整的动态页池创建
    pub fn new(ops: Box<dyn ArchMmOps>, platform: Platform, kind: TranslationKind) -> Self {
        Self::with_frames(ops, platform, kind, FrameAllocator::new())
    }

    /// 使用给定的分配器创建
    pub fn with_frames(
        ops: Box<dyn ArchMmOps>,
        platform: Platform,
        kind: TranslationKind,
        frames: FrameAllocator,
    ) -> Self {
        let translation: Box<dyn Translation> = match kind {
            TranslationKind::PageTable => Box::new(PageTable::new()),
            TranslationKind::SoftTlb => Box::new(SoftTlb::new()),
        };
        Self {
            frames,
            ops,
            translation,
            platform,
        }
    }

    fn context(&mut self) -> (MmContext<'_>, &mut dyn Translation) {
        (
            MmContext {
                frames: &mut self.frames,
                ops: &*self.ops,
                platform: self.platform,
            },
            &mut *self.translation,
        )
    }

    /// 运行平台
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// 当前翻译机制
    pub fn kind(&self) -> TranslationKind {
        self.translation.kind()
    }

    /// 物理页分配器（只读）
    pub fn frames(&self) -> &FrameAllocator {
        &self.frames
    }

    /// 硬件操作
    pub fn ops(&self) -> &dyn ArchMmOps {
        &*self.ops
    }

    /// 建立并启用内核地址空间（页表机制下为 0 号恒等映射）
    pub fn init_kernel_space(&mut self) -> PagingResult<()> {
        let (mut cx, translation) = self.context();
        translation.init_kernel_space(&mut cx)?;
        log::info!("{} translation is ready", self.kind());
        Ok(())
    }

    /// 分配一个物理页
    pub fn alloc(&mut self) -> PagingResult<PageId> {
        self.frames.alloc()
    }

    /// 回收 `pid` 的全部物理页和地址空间
    pub fn free(&mut self, pid: Pid) {
        let freed = self.frames.free(pid);
        self.translation.release(pid);
        log::debug!("mmu: released {} pages of pid {}", freed, pid);
    }

    /// 把 `pid` 的虚拟页 `vpn` 映射到 `page`
    pub fn map(&mut self, pid: Pid, vpn: Vpn, page: PageId) -> PagingResult<()> {
        self.frames.assign(page, pid, vpn)?;
        let (mut cx, translation) = self.context();
        translation.map(&mut cx, pid, vpn, page)
    }

    /// 切换到 `pid` 的地址空间
    pub fn switch(&mut self, pid: Pid) -> PagingResult<()> {
        let (mut cx, translation) = self.context();
        translation.switch(&mut cx, pid)
    }

    /// 翻译 `pid` 的虚拟地址
    pub fn translate(&mut self, pid: Pid, va: Vaddr) -> PagingResult<Paddr> {
        let (mut cx, translation) = self.context();
        translation.translate(&mut cx, pid, va)
    }

    /// 刷新翻译缓存，每次 [`Mmu::switch`] 之后、回到进程之前必须调用
    pub fn flush_cache(&self) {
        if self.platform == Platform::Arty {
            self.ops.flush_icache();
        }
        if self.kind() == TranslationKind::PageTable {
            self.ops.flush_tlb();
        }
    }

    /// 清零物理页
    pub fn zero_page(&self, page: PageId) {
        self.ops.zero_page(page.ppn());
    }

    /// 向物理页 `page` 的 `offset` 处写入（不经过翻译）
    pub fn write_page(&self, page: PageId, offset: usize, data: &[u8]) {
        debug_assert!(offset + data.len() <= PAGE_SIZE);
        self.ops.write_bytes(page.paddr().add(offset), data);
    }

    /// 经 `pid` 的地址空间读取用户内存
    pub fn copy_from_user(&mut self, pid: Pid, va: Vaddr, buf: &mut [u8]) -> PagingResult<()> {
        let mut done = 0;
        while done < buf.len() {
            let cur = va.add(done);
            let chunk = (PAGE_SIZE - cur.page_offset()).min(buf.len() - done);
            let pa = self.translate(pid, cur)?;
            self.ops.read_bytes(pa, &mut buf[done..done + chunk]);
            done += chunk;
        }
        Ok(())
    }

    /// 经 `pid` 的地址空间写入用户内存
    pub fn copy_to_user(&mut self, pid: Pid, va: Vaddr, data: &[u8]) -> PagingResult<()> {
        let mut done = 0;
        while done < data.len() {
            let cur = va.add(done);
            let chunk = (PAGE_SIZE - cur.page_offset()).min(data.len() - done);
            let pa = self.translate(pid, cur)?;
            self.ops.write_bytes(pa, &data[done..done + chunk]);
            done += chunk;
        }
        Ok(())
    }
}
