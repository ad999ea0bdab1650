//! CLINT 与异常 CSR 的 Mock 实现

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use ::kernel::ArchKernelOps;
use ::kernel::config::NCORES;

#[derive(Default)]
struct ClintState {
    mtime: u64,
    // 非空时 mtime_hi / mtime_lo 依次从这里取值，用于模拟进位竞争
    scripted: VecDeque<u32>,
    mtimecmp: [Option<u64>; NCORES],
    mtval: usize,
    satp: usize,
}

/// 模拟 CLINT，克隆得到的句柄共享状态
#[derive(Clone, Default)]
pub struct MockClint {
    state: Arc<Mutex<ClintState>>,
}

impl MockClint {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ClintState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_mtime(&self, value: u64) {
        self.lock().mtime = value;
    }

    pub fn advance(&self, ticks: u64) {
        self.lock().mtime += ticks;
    }

    /// 之后的半字读取依次返回 `halves`
    pub fn script_reads(&self, halves: &[u32]) {
        self.lock().scripted.extend(halves.iter().copied());
    }

    pub fn mtimecmp(&self, core: usize) -> Option<u64> {
        self.lock().mtimecmp[core]
    }

    /// 下一次异常的 mtval
    pub fn set_fault_addr(&self, addr: usize) {
        self.lock().mtval = addr;
    }

    pub fn set_satp(&self, satp: usize) {
        self.lock().satp = satp;
    }

    pub fn boxed(&self) -> Box<dyn ArchKernelOps> {
        Box::new(self.clone())
    }
}

impl ArchKernelOps for MockClint {
    fn mtime_hi(&self) -> u32 {
        let mut state = self.lock();
        match state.scripted.pop_front() {
            Some(v) => v,
            None => (state.mtime >> 32) as u32,
        }
    }

    fn mtime_lo(&self) -> u32 {
        let mut state = self.lock();
        match state.scripted.pop_front() {
            Some(v) => v,
            None => state.mtime as u32,
        }
    }

    fn set_mtimecmp(&self, core: usize, value: u64) {
        self.lock().mtimecmp[core] = Some(value);
    }

    fn fault_addr(&self) -> usize {
        self.lock().mtval
    }

    fn page_table_base(&self) -> usize {
        self.lock().satp
    }
}
