//! 64 位时钟与时间片

use crate::hal::ArchKernelOps;

/// mtimecmp 的“永不触发”值
pub const TIMER_DISARMED: u64 = 0x0FFF_FFFF_FFFF_FFFF;

/// 周期性时间片定时器
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    quantum: u64,
}

impl Timer {
    /// 以 `quantum` 个 mtime 计数为一个时间片
    pub const fn new(quantum: u64) -> Self {
        Self { quantum }
    }

    /// 时间片长度
    pub fn quantum(&self) -> u64 {
        self.quantum
    }

    /// 读取 64 位 mtime
    ///
    /// 高低两半分两次读取，若期间低位进位导致高位变化则重读。
    pub fn mtime(ops: &dyn ArchKernelOps) -> u64 {
        loop {
            let hi = ops.mtime_hi();
            let lo = ops.mtime_lo();
            if ops.mtime_hi() == hi {
                return ((hi as u64) << 32) | lo as u64;
            }
        }
    }

    /// 开中断之前先把比较值推到无穷远
    pub fn init(&self, ops: &dyn ArchKernelOps, core: usize) {
        ops.set_mtimecmp(core, TIMER_DISARMED);
    }

    /// 从现在起再过一个时间片触发中断
    pub fn reset(&self, ops: &dyn ArchKernelOps, core: usize) {
        let now = Self::mtime(ops);
        ops.set_mtimecmp(core, now + self.quantum);
    }
}
