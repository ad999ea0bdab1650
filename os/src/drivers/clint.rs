//! 核心本地中断器

use mm::Platform;

use super::{read_reg, write_reg};
use crate::platform::hart_of;

const MTIMECMP_BASE: usize = 0x4000;
const MTIME_BASE: usize = 0xBFF8;

/// CLINT 的 mtime 与各 hart 的 mtimecmp
#[derive(Debug)]
pub struct Clint {
    base: usize,
    platform: Platform,
}

impl Clint {
    /// 平台的 CLINT
    pub const fn new(platform: Platform) -> Self {
        Self {
            base: platform.clint_base(),
            platform,
        }
    }

    /// mtime 高 32 位
    pub fn mtime_hi(&self) -> u32 {
        read_reg(self.base, MTIME_BASE + 4)
    }

    /// mtime 低 32 位
    pub fn mtime_lo(&self) -> u32 {
        read_reg(self.base, MTIME_BASE)
    }

    /// 设置内核核心 `core` 的 mtimecmp
    ///
    /// 先把高位写成全 1，中间状态不会早于目标时间触发中断。
    pub fn set_mtimecmp(&self, core: usize, value: u64) {
        let offset = MTIMECMP_BASE + hart_of(self.platform, core) * 8;
        write_reg(self.base, offset + 4, u32::MAX);
        write_reg(self.base, offset, value as u32);
        write_reg(self.base, offset + 4, (value >> 32) as u32);
    }
}
