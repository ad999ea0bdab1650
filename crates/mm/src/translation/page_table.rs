//! Sv32 页表
//!
//! 每个进程一棵两级页表：根表 1024 项，每项覆盖 4 MiB，指向按需分配的叶表；
//! 叶表 1024 项，每项映射一个 4 KiB 物理页。页表页本身从动态页池分配，
//! 记在对应进程名下，进程回收时随之释放。
//!
//! 0 号地址空间是内核的恒等映射（全部内存与设备窗口）。系统进程
//! （pid < GPID_USER_START）的根表额外共享 0 号根表中内核区域的表项，
//! 所有进程在 [`WORK_DIR`] 处共享同一个工作目录页。

use alloc::collections::BTreeMap;

use bitflags::bitflags;

use super::{MmContext, Translation};
use crate::address::{PageId, PageNum, Paddr, Ppn, Vaddr, Vpn};
use crate::config::{
    APPS_PAGES_BASE, LEAF_SPAN, Platform, RAM_END, RAM_START,
    TranslationKind, WORK_DIR,
};
use crate::error::{PagingError, PagingResult};
use uapi::{GPID_UNUSED, Pid, is_system_pid};

bitflags! {
    /// Sv32 页表项标志位
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PteFlags: u32 {
        /// 有效
        const V = 1 << 0;
        /// 可读
        const R = 1 << 1;
        /// 可写
        const W = 1 << 2;
        /// 可执行
        const X = 1 << 3;
        /// 用户态可访问
        const U = 1 << 4;
        /// 全局
        const G = 1 << 5;
        /// 已访问
        const A = 1 << 6;
        /// 已写
        const D = 1 << 7;
    }
}

/// 叶表项权限：V | R | W | X | U | A | D
pub const PTE_USER_RWX: PteFlags = PteFlags::V
    .union(PteFlags::R)
    .union(PteFlags::W)
    .union(PteFlags::X)
    .union(PteFlags::U)
    .union(PteFlags::A)
    .union(PteFlags::D);

const ENTRIES: usize = 1024;
const PTE_SIZE: usize = 4;

#[inline]
fn make_pte(ppn: Ppn, flags: PteFlags) -> u32 {
    ((ppn.0 << 10) as u32) | flags.bits()
}

#[inline]
fn is_valid(pte: u32) -> bool {
    PteFlags::from_bits_truncate(pte).contains(PteFlags::V)
}

#[inline]
fn pte_ppn(pte: u32) -> Ppn {
    Ppn((pte >> 10) as usize)
}

#[inline]
fn entry_addr(table: Ppn, index: usize) -> Paddr {
    table.start_addr().add(index * PTE_SIZE)
}

/// Sv32 页表机制
pub struct PageTable {
    // 进程号单调递增，按 pid 索引的数组迟早会越界
    roots: BTreeMap<Pid, Ppn>,
    work_page: Option<PageId>,
}

impl PageTable {
    /// 尚未建立任何地址空间
    pub fn new() -> Self {
        Self {
            roots: BTreeMap::new(),
            work_page: None,
        }
    }

    /// `pid` 的根表
    pub fn root_of(&self, pid: Pid) -> PagingResult<Option<Ppn>> {
        if pid < 0 {
            return Err(PagingError::InvalidPid(pid));
        }
        Ok(self.roots.get(&pid).copied())
    }

    fn set_root(&mut self, pid: Pid, root: Ppn) -> PagingResult<()> {
        if pid < 0 {
            return Err(PagingError::InvalidPid(pid));
        }
        self.roots.insert(pid, root);
        Ok(())
    }

    /// 为 `pid` 分配并清零一张页表
    fn alloc_table(cx: &mut MmContext<'_>, pid: Pid) -> PagingResult<Ppn> {
        let page = cx.frames.alloc_for(pid)?;
        cx.ops.zero_page(page.ppn());
        Ok(page.ppn())
    }

    /// 找到或创建 `root` 第 `vpn1` 项指向的叶表
    fn ensure_leaf(cx: &mut MmContext<'_>, root: Ppn, pid: Pid, vpn1: usize) -> PagingResult<Ppn> {
        let slot = entry_addr(root, vpn1);
        let pte = cx.ops.read_u32(slot);
        if is_valid(pte) {
            return Ok(pte_ppn(pte));
        }
        let leaf = Self::alloc_table(cx, pid)?;
        // R/W/X 全零表示指向下一级
        cx.ops.write_u32(slot, make_pte(leaf, PteFlags::V));
        Ok(leaf)
    }

    /// 在 `root` 中恒等映射 `[addr, addr + npages * PAGE_SIZE)`，不得跨越叶表
    fn identity_region(
        cx: &mut MmContext<'_>,
        root: Ppn,
        pid: Pid,
        addr: usize,
        npages: usize,
    ) -> PagingResult<()> {
        let first = Vpn::from_addr_floor(Vaddr(addr));
        if first.vpn0() + npages > ENTRIES {
            return Err(PagingError::InvalidAddress);
        }
        let leaf = Self::ensure_leaf(cx, root, pid, first.vpn1())?;
        for i in 0..npages {
            let pte = make_pte(Ppn(first.0 + i), PTE_USER_RWX);
            cx.ops.write_u32(entry_addr(leaf, first.vpn0() + i), pte);
        }
        Ok(())
    }

    /// 为 `pid` 建立全内存与设备窗口的恒等映射，返回根表
    pub fn identity_map(&mut self, cx: &mut MmContext<'_>, pid: Pid) -> PagingResult<Ppn> {
        let root = Self::alloc_table(cx, pid)?;
        self.set_root(pid, root)?;

        for addr in (RAM_START..RAM_END).step_by(LEAF_SPAN) {
            Self::identity_region(cx, root, pid, addr, ENTRIES)?;
        }
        for (base, npages) in cx.platform.device_windows() {
            Self::identity_region(cx, root, pid, base, npages)?;
        }
        log::debug!("identity map for pid {} built at {}", pid, root.start_addr());
        Ok(root)
    }

    /// 内核需要在任何页表下都可达的区域
    fn kernel_regions(platform: Platform) -> [usize; 6] {
        [
            RAM_START,
            APPS_PAGES_BASE,
            APPS_PAGES_BASE + LEAF_SPAN,
            platform.clint_base(),
            platform.uart_base(),
            platform.spi_base(),
        ]
    }

    /// 把 0 号根表中内核区域的表项复制到 `root`
    fn share_kernel_entries(&self, cx: &mut MmContext<'_>, root: Ppn) {
        let Some(&kernel_root) = self.roots.get(&GPID_UNUSED) else {
            return;
        };
        for base in Self::kernel_regions(cx.platform) {
            let vpn1 = Vpn::from_addr_floor(Vaddr(base)).vpn1();
            let slot = entry_addr(root, vpn1);
            if !is_valid(cx.ops.read_u32(slot)) {
                let shared = cx.ops.read_u32(entry_addr(kernel_root, vpn1));
                cx.ops.write_u32(slot, shared);
            }
        }
    }

    /// 在 `root` 中映射共享的工作目录页
    fn map_work_page(&mut self, cx: &mut MmContext<'_>, root: Ppn, pid: Pid) -> PagingResult<()> {
        let vpn = Vpn::from_addr_floor(Vaddr(WORK_DIR));
        let leaf = Self::ensure_leaf(cx, root, pid, vpn.vpn1())?;
        let work = match self.work_page {
            Some(page) => page,
            None => {
                // 记在 0 号名下，不随任何用户进程回收
                let page = cx.frames.alloc_for(GPID_UNUSED)?;
                cx.ops.zero_page(page.ppn());
                self.work_page = Some(page);
                page
            }
        };
        let slot = entry_addr(leaf, vpn.vpn0());
        if !is_valid(cx.ops.read_u32(slot)) {
            cx.ops.write_u32(slot, make_pte(work.ppn(), PTE_USER_RWX));
        }
        Ok(())
    }

    /// 找到或创建 `pid` 的根表
    fn ensure_root(&mut self, cx: &mut MmContext<'_>, pid: Pid) -> PagingResult<Ppn> {
        if let Some(root) = self.root_of(pid)? {
            return Ok(root);
        }
        let root = Self::alloc_table(cx, pid)?;
        self.set_root(pid, root)?;
        if is_system_pid(pid) {
            self.share_kernel_entries(cx, root);
        }
        self.map_work_page(cx, root, pid)?;
        log::debug!("page table for pid {} created at {}", pid, root.start_addr());
        Ok(root)
    }
}

impl Default for PageTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Translation for PageTable {
    fn kind(&self) -> TranslationKind {
        TranslationKind::PageTable
    }

    fn init_kernel_space(&mut self, cx: &mut MmContext<'_>) -> PagingResult<()> {
        let root = self.identity_map(cx, GPID_UNUSED)?;
        cx.ops.activate(root);
        Ok(())
    }

    fn map(&mut self, cx: &mut MmContext<'_>, pid: Pid, vpn: Vpn, page: PageId) -> PagingResult<()> {
        let root = self.ensure_root(cx, pid)?;
        let leaf = Self::ensure_leaf(cx, root, pid, vpn.vpn1())?;
        let slot = entry_addr(leaf, vpn.vpn0());
        // 已有映射时保持不变
        if is_valid(cx.ops.read_u32(slot)) {
            return Ok(());
        }
        cx.ops.write_u32(slot, make_pte(page.ppn(), PTE_USER_RWX));
        Ok(())
    }

    fn switch(&mut self, cx: &mut MmContext<'_>, pid: Pid) -> PagingResult<()> {
        let root = self.root_of(pid)?.ok_or(PagingError::NoAddressSpace(pid))?;
        cx.ops.activate(root);
        Ok(())
    }

    fn translate(&mut self, cx: &mut MmContext<'_>, pid: Pid, va: Vaddr) -> PagingResult<Paddr> {
        let root = self.root_of(pid)?.ok_or(PagingError::NoAddressSpace(pid))?;
        let vpn = Vpn::from_addr_floor(va);
        let root_pte = cx.ops.read_u32(entry_addr(root, vpn.vpn1()));
        if !is_valid(root_pte) {
            return Err(PagingError::NotMapped(pid, va));
        }
        let leaf_pte = cx.ops.read_u32(entry_addr(pte_ppn(root_pte), vpn.vpn0()));
        if !is_valid(leaf_pte) {
            return Err(PagingError::NotMapped(pid, va));
        }
        Ok(pte_ppn(leaf_pte).start_addr().add(va.page_offset()))
    }

    fn release(&mut self, pid: Pid) {
        self.roots.remove(&pid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pte_encoding() {
        let ppn = PageId(3).ppn();
        let pte = make_pte(ppn, PTE_USER_RWX);
        assert_eq!(pte_ppn(pte), ppn);
        assert_eq!(pte & 0x3FF, 0xDF);
        // 等价于 paddr >> 2
        assert_eq!(pte & !0x3FF, (PageId(3).paddr().0 >> 2) as u32);
    }

    #[test]
    fn test_root_index_bounds() {
        let pt = PageTable::new();
        assert_eq!(pt.root_of(-1), Err(PagingError::InvalidPid(-1)));
        assert_eq!(pt.root_of(256), Ok(None));
        assert_eq!(pt.root_of(Pid::MAX), Ok(None));
    }

    #[test]
    fn test_kernel_regions_cover_pool() {
        let regions = PageTable::kernel_regions(Platform::Qemu);
        assert_eq!(regions[1] >> 22, 0x202);
        assert_eq!(regions[2] >> 22, 0x203);
    }
}
