//! 中断开关与 hart 编号的 Mock 实现
//!
//! `sync` crate 在 `cfg(test)` 下为 [`MockArchOps`] 实现 `ArchOps`。

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Mock 架构操作
pub struct MockArchOps {
    pub interrupt_enabled: AtomicBool,
    pub hart_id: AtomicUsize,
}

impl MockArchOps {
    /// mstatus.MIE
    pub const MIE: usize = 1 << 3;

    pub const fn new() -> Self {
        Self {
            interrupt_enabled: AtomicBool::new(true),
            hart_id: AtomicUsize::new(0),
        }
    }

    /// 关中断，返回之前的 mstatus.MIE
    pub fn disable_interrupts(&self) -> usize {
        if self.interrupt_enabled.swap(false, Ordering::SeqCst) {
            Self::MIE
        } else {
            0
        }
    }

    pub fn restore(&self, flags: usize) {
        self.interrupt_enabled
            .store(flags & Self::MIE != 0, Ordering::SeqCst);
    }

    pub fn hart(&self) -> usize {
        self.hart_id.load(Ordering::Relaxed)
    }
}

impl Default for MockArchOps {
    fn default() -> Self {
        Self::new()
    }
}

/// 全局 Mock 实例
pub static MOCK_ARCH_OPS: MockArchOps = MockArchOps::new();
