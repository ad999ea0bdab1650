//! RV32 机器模式 CSR 操作
//!
//! 库 crate 需要的硬件 trait 都在这里实现：
//! - [`SyncArchOps`]: `sync::ArchOps`，开关 mstatus.MIE
//! - [`KernelArch`]: `kernel::ArchKernelOps`，CLINT 加 mtval / satp

use core::arch::asm;

use kernel::{ArchKernelOps, PrivMode};
use riscv::register::mstatus::{self, MPP};
use riscv::register::mie;

use crate::drivers::Clint;

/// mstatus.MIE
pub const MSTATUS_MIE: usize = 1 << 3;

/// 当前 hart 号
#[inline]
pub fn hart_id() -> usize {
    let id: usize;
    // SAFETY: 只读 CSR
    unsafe { asm!("csrr {}, mhartid", out(reg) id) };
    id
}

#[inline]
fn wfi() {
    // SAFETY: 只是等待中断
    unsafe { asm!("wfi", options(nomem, nostack)) };
}

/// 关闭本地中断，返回之前的 mstatus.MIE
#[inline]
pub fn read_and_disable_interrupts() -> usize {
    let old: usize;
    // SAFETY: 只清除 MIE 位
    unsafe { asm!("csrrci {}, mstatus, 8", out(reg) old) };
    old & MSTATUS_MIE
}

/// 恢复 [`read_and_disable_interrupts`] 保存的中断状态
#[inline]
pub fn restore_interrupts(flags: usize) {
    if flags & MSTATUS_MIE != 0 {
        // SAFETY: 恢复之前的中断状态
        unsafe { mstatus::set_mie() };
    }
}

/// sync crate 的 ArchOps 实现
pub struct SyncArchOps;

impl sync::ArchOps for SyncArchOps {
    unsafe fn read_and_disable_interrupts(&self) -> usize {
        read_and_disable_interrupts()
    }

    unsafe fn restore_interrupts(&self, flags: usize) {
        restore_interrupts(flags)
    }

    fn interrupt_enable_bit(&self) -> usize {
        MSTATUS_MIE
    }

    fn hart_id(&self) -> usize {
        hart_id()
    }
}

/// 全局 ArchOps 实例
pub static SYNC_ARCH_OPS: SyncArchOps = SyncArchOps;

/// 内核核心需要的 CLINT 与 CSR 访问
pub struct KernelArch {
    clint: Clint,
}

impl KernelArch {
    /// 基于平台 CLINT
    pub const fn new(clint: Clint) -> Self {
        Self { clint }
    }
}

impl ArchKernelOps for KernelArch {
    fn mtime_hi(&self) -> u32 {
        self.clint.mtime_hi()
    }

    fn mtime_lo(&self) -> u32 {
        self.clint.mtime_lo()
    }

    fn set_mtimecmp(&self, core: usize, value: u64) {
        self.clint.set_mtimecmp(core, value);
    }

    fn fault_addr(&self) -> usize {
        let mtval: usize;
        // SAFETY: 只读 CSR
        unsafe { asm!("csrr {}, mtval", out(reg) mtval) };
        mtval
    }

    fn page_table_base(&self) -> usize {
        let satp: usize;
        // SAFETY: 只读 CSR
        unsafe { asm!("csrr {}, satp", out(reg) satp) };
        satp
    }
}

/// 物理内存保护：允许低特权级访问整个地址空间
///
/// 页表模式下进程运行在用户模式，没有 PMP 表项时任何访存都会出错。
pub fn init_pmp() {
    // SAFETY: TOR 模式，pmpaddr0 = 0x4000_0000 覆盖 32 位地址空间，RWX
    unsafe {
        asm!("csrw pmpaddr0, {}", in(reg) 0x4000_0000usize);
        asm!("csrw pmpcfg0, {}", in(reg) 0xFusize);
    }
}

/// 设置陷入向量并打开时钟中断使能位，全局中断仍关闭
pub fn init_trap_vector(entry: usize) {
    // SAFETY: 只在本 hart 初始化时调用
    unsafe {
        // 直接模式，低两位为 0
        asm!("csrw mtvec, {}", in(reg) entry & !0b11);
        asm!("csrw mip, zero");
        mie::set_mtimer();
    }
}

/// 设置 mret 之后的特权级，并在返回时打开中断
pub fn set_return_mode(mode: PrivMode) {
    let mpp = match mode {
        PrivMode::Machine => MPP::Machine,
        PrivMode::User => MPP::User,
    };
    // SAFETY: 只影响本次 mret
    unsafe {
        mstatus::set_mpp(mpp);
        mstatus::set_mpie();
    }
}

/// 打开中断，等待
pub fn wait_for_interrupt() -> ! {
    // SAFETY: 陷入向量已设置
    unsafe { mstatus::set_mie() };
    loop {
        wfi();
    }
}

/// 关中断停机
pub fn halt() -> ! {
    read_and_disable_interrupts();
    loop {
        wfi();
    }
}
