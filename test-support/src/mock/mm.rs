//! 模拟物理内存
//!
//! 按页稀疏存储，未写过的页读出全零。克隆得到的句柄共享同一块内存，
//! 测试可以把一份交给 `Mmu`，自己留一份检查内容和硬件操作记录。

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use ::mm::address::{Paddr, Ppn};
use ::mm::config::PAGE_SIZE;
use ::mm::{satp_value, ArchMmOps};

#[derive(Default)]
struct PhysState {
    pages: HashMap<usize, Box<[u8; PAGE_SIZE]>>,
    satp: Vec<usize>,
    tlb_flushes: usize,
    icache_flushes: usize,
    page_copies: usize,
}

/// 模拟物理内存及 satp / fence 记录
#[derive(Clone, Default)]
pub struct MockPhysMem {
    state: Arc<Mutex<PhysState>>,
}

impl MockPhysMem {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, PhysState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 读取任意长度
    pub fn read(&self, pa: usize, len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        self.read_bytes(Paddr(pa), &mut buf);
        buf
    }

    /// 写入任意长度
    pub fn write(&self, pa: usize, data: &[u8]) {
        self.write_bytes(Paddr(pa), data);
    }

    /// 历次写入 satp 的值
    pub fn satp_writes(&self) -> Vec<usize> {
        self.lock().satp.clone()
    }

    /// 最近一次写入 satp 的值
    pub fn satp(&self) -> Option<usize> {
        self.lock().satp.last().copied()
    }

    pub fn tlb_flushes(&self) -> usize {
        self.lock().tlb_flushes
    }

    pub fn icache_flushes(&self) -> usize {
        self.lock().icache_flushes
    }

    /// 整页拷贝次数（软件 TLB 换入换出的代价）
    pub fn page_copies(&self) -> usize {
        self.lock().page_copies
    }

    pub fn boxed(&self) -> Box<dyn ArchMmOps> {
        Box::new(self.clone())
    }
}

impl ArchMmOps for MockPhysMem {
    fn read_bytes(&self, pa: Paddr, buf: &mut [u8]) {
        let state = self.lock();
        for (i, byte) in buf.iter_mut().enumerate() {
            let addr = pa.0 + i;
            *byte = state
                .pages
                .get(&(addr / PAGE_SIZE))
                .map_or(0, |page| page[addr % PAGE_SIZE]);
        }
    }

    fn write_bytes(&self, pa: Paddr, data: &[u8]) {
        let mut state = self.lock();
        for (i, &byte) in data.iter().enumerate() {
            let addr = pa.0 + i;
            let page = state
                .pages
                .entry(addr / PAGE_SIZE)
                .or_insert_with(|| Box::new([0u8; PAGE_SIZE]));
            page[addr % PAGE_SIZE] = byte;
        }
    }

    fn copy_page(&self, dst: Ppn, src: Ppn) {
        let mut state = self.lock();
        state.page_copies += 1;
        let content = state
            .pages
            .get(&src.0)
            .map_or_else(|| Box::new([0u8; PAGE_SIZE]), |page| page.clone());
        state.pages.insert(dst.0, content);
    }

    fn activate(&self, root: Ppn) {
        self.lock().satp.push(satp_value(root));
    }

    fn flush_tlb(&self) {
        self.lock().tlb_flushes += 1;
    }

    fn flush_icache(&self) {
        self.lock().icache_flushes += 1;
    }
}
