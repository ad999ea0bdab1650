//! 只读磁盘
//!
//! 磁盘镜像位于 [`BOARD_FLASH_ROM`]：Arty 上烧录在板载 Flash 中，
//! QEMU 上由 `-device loader` 装到同一地址。

use kernel::BlockDevice;
use kernel::config::BLOCK_SIZE;
use mm::config::BOARD_FLASH_ROM;

/// 内存映射的磁盘镜像
#[derive(Debug)]
pub struct RomDisk {
    base: usize,
}

impl RomDisk {
    /// 板载 Flash 上的磁盘
    pub const fn new() -> Self {
        Self {
            base: BOARD_FLASH_ROM,
        }
    }
}

impl Default for RomDisk {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockDevice for RomDisk {
    fn read_blocks(&mut self, block: u32, dst: &mut [u8]) {
        let src = self.base + block as usize * BLOCK_SIZE;
        // SAFETY: 镜像窗口在内核地址空间中恒等映射，只读
        unsafe { core::ptr::copy_nonoverlapping(src as *const u8, dst.as_mut_ptr(), dst.len()) };
    }

    fn write_blocks(&mut self, block: u32, src: &[u8]) {
        log::error!(
            "rom disk: write of {} blocks at #{} dropped",
            src.len() / BLOCK_SIZE,
            block
        );
    }
}
