//! 架构相关内存操作
//!
//! 内核运行在机器模式，直接以物理地址访问内存；这里把这些访问
//! 以及 satp / sfence.vma / fence.i 收拢到一个 trait 里，
//! 使得两种翻译机制都能在宿主机上用模拟内存测试。

use crate::address::{Paddr, Ppn};
use crate::config::PAGE_SIZE;

/// 架构相关内存操作
///
/// 由 os crate 为 RV32 实现，测试中由模拟物理内存实现。
pub trait ArchMmOps: Send + Sync {
    /// 从物理地址读取 `buf.len()` 字节
    fn read_bytes(&self, pa: Paddr, buf: &mut [u8]);

    /// 向物理地址写入
    fn write_bytes(&self, pa: Paddr, data: &[u8]);

    /// 读取一个 32 位字（页表项）
    fn read_u32(&self, pa: Paddr) -> u32 {
        let mut raw = [0u8; 4];
        self.read_bytes(pa, &mut raw);
        u32::from_le_bytes(raw)
    }

    /// 写入一个 32 位字（页表项）
    fn write_u32(&self, pa: Paddr, value: u32) {
        self.write_bytes(pa, &value.to_le_bytes());
    }

    /// 清零一页
    fn zero_page(&self, ppn: Ppn) {
        let zeros = [0u8; 256];
        let base = ppn.0 * PAGE_SIZE;
        for off in (0..PAGE_SIZE).step_by(zeros.len()) {
            self.write_bytes(Paddr(base + off), &zeros);
        }
    }

    /// 整页拷贝
    fn copy_page(&self, dst: Ppn, src: Ppn) {
        let mut buf = [0u8; 256];
        for off in (0..PAGE_SIZE).step_by(buf.len()) {
            self.read_bytes(Paddr(src.0 * PAGE_SIZE + off), &mut buf);
            self.write_bytes(Paddr(dst.0 * PAGE_SIZE + off), &buf);
        }
    }

    /// 以 `root` 为根页表开启 Sv32 翻译（写 satp）
    fn activate(&self, root: Ppn);

    /// 刷新 TLB（sfence.vma）
    fn flush_tlb(&self);

    /// 刷新 L1 指令缓存（仅 Arty 需要）
    fn flush_icache(&self);
}

/// satp 中 Sv32 模式位
pub const SATP_MODE_SV32: usize = 1 << 31;

/// 根页表对应的 satp 值
#[inline]
pub const fn satp_value(root: Ppn) -> usize {
    SATP_MODE_SV32 | root.0
}
