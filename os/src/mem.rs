//! 物理内存访问
//!
//! 内核运行在机器模式且不开 MPRV，satp 对内核自身无效，
//! 所有访存都直接使用物理地址。

use core::arch::asm;

use mm::address::{Paddr, Ppn};
use mm::config::PAGE_SIZE;
use mm::{ArchMmOps, satp_value};

/// RV32 上的 [`ArchMmOps`] 实现
pub struct PhysMem;

impl ArchMmOps for PhysMem {
    fn read_bytes(&self, pa: Paddr, buf: &mut [u8]) {
        // SAFETY: mm 只传入 RAM 或设备窗口内的地址
        unsafe { core::ptr::copy_nonoverlapping(pa.0 as *const u8, buf.as_mut_ptr(), buf.len()) };
    }

    fn write_bytes(&self, pa: Paddr, data: &[u8]) {
        // SAFETY: 同上
        unsafe { core::ptr::copy_nonoverlapping(data.as_ptr(), pa.0 as *mut u8, data.len()) };
    }

    fn read_u32(&self, pa: Paddr) -> u32 {
        // SAFETY: 页表项 4 字节对齐
        unsafe { (pa.0 as *const u32).read_volatile() }
    }

    fn write_u32(&self, pa: Paddr, value: u32) {
        // SAFETY: 同上
        unsafe { (pa.0 as *mut u32).write_volatile(value) }
    }

    fn zero_page(&self, ppn: Ppn) {
        // SAFETY: 整页属于调用方
        unsafe { core::ptr::write_bytes((ppn.0 * PAGE_SIZE) as *mut u8, 0, PAGE_SIZE) };
    }

    fn copy_page(&self, dst: Ppn, src: Ppn) {
        // SAFETY: 两页不重叠
        unsafe {
            core::ptr::copy_nonoverlapping(
                (src.0 * PAGE_SIZE) as *const u8,
                (dst.0 * PAGE_SIZE) as *mut u8,
                PAGE_SIZE,
            )
        };
    }

    fn activate(&self, root: Ppn) {
        // SAFETY: root 是已建好的 Sv32 根页表，只影响用户模式访存
        unsafe { asm!("csrw satp, {}", in(reg) satp_value(root)) };
    }

    fn flush_tlb(&self) {
        // SAFETY: 刷新全部 TLB 表项
        unsafe { asm!("sfence.vma zero, zero") };
    }

    fn flush_icache(&self) {
        // fence.i，汇编器不一定认识 Zifencei
        // SAFETY: 只同步指令缓存
        unsafe { asm!(".word 0x100F", "nop", "nop", "nop", "nop", "nop") };
    }
}
