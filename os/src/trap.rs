//! 陷入向量
//!
//! 每个 hart 有一块 [`HartScratch`]，mscratch 平时指向它。陷入时 `trap_entry`
//! 与 sp 交换，把全部通用寄存器和 mepc 存进其中的陷入帧，切到该 hart 的
//! 内核栈调用 [`trap_handler`]，返回后从（可能已被换成另一个进程的）陷入帧
//! 恢复现场并 mret。
//!
//! 内核锁只在 [`kernel::Kernel::kernel_entry`] 期间持有，陷入帧是每个 hart
//! 私有的，恢复现场不需要锁。

use core::arch::global_asm;
use core::cell::UnsafeCell;

use kernel::{TrapExit, TrapFrame};

use crate::arch;
use crate::boot::kernel;
use crate::platform::{MAX_HARTS, PLATFORM, core_of};

/// hart 私有的陷入区域，布局被 `trap_entry` 依赖
#[repr(C)]
pub struct HartScratch {
    frame: TrapFrame,
    kernel_sp: usize,
}

struct ScratchTable(UnsafeCell<[HartScratch; MAX_HARTS]>);

// SAFETY: 每个 hart 只访问自己的表项
unsafe impl Sync for ScratchTable {}

const EMPTY_SCRATCH: HartScratch = HartScratch {
    frame: TrapFrame {
        regs: [0; 32],
        mepc: 0,
    },
    kernel_sp: 0,
};

static SCRATCH: ScratchTable = ScratchTable(UnsafeCell::new([EMPTY_SCRATCH; MAX_HARTS]));

fn scratch_of(hart: usize) -> *mut HartScratch {
    // SAFETY: hart < MAX_HARTS，由启动代码保证
    unsafe { (*SCRATCH.0.get()).as_mut_ptr().add(hart) }
}

/// 本 hart 的陷入区域交给 mscratch
pub fn install_scratch(hart: usize, kernel_sp: usize) {
    let scratch = scratch_of(hart);
    // SAFETY: 只有本 hart 访问自己的表项
    unsafe {
        (*scratch).kernel_sp = kernel_sp;
        core::arch::asm!("csrw mscratch, {}", in(reg) scratch);
    }
}

/// 陷入向量地址
pub fn entry() -> usize {
    trap_entry as usize
}

global_asm!(
    "
    .section .text
    .globl trap_entry
    .p2align 2
trap_entry:
    csrrw sp, mscratch, sp
    sw x1, 1*4(sp)
    sw x3, 3*4(sp)
    sw x4, 4*4(sp)
    sw x5, 5*4(sp)
    sw x6, 6*4(sp)
    sw x7, 7*4(sp)
    sw x8, 8*4(sp)
    sw x9, 9*4(sp)
    sw x10, 10*4(sp)
    sw x11, 11*4(sp)
    sw x12, 12*4(sp)
    sw x13, 13*4(sp)
    sw x14, 14*4(sp)
    sw x15, 15*4(sp)
    sw x16, 16*4(sp)
    sw x17, 17*4(sp)
    sw x18, 18*4(sp)
    sw x19, 19*4(sp)
    sw x20, 20*4(sp)
    sw x21, 21*4(sp)
    sw x22, 22*4(sp)
    sw x23, 23*4(sp)
    sw x24, 24*4(sp)
    sw x25, 25*4(sp)
    sw x26, 26*4(sp)
    sw x27, 27*4(sp)
    sw x28, 28*4(sp)
    sw x29, 29*4(sp)
    sw x30, 30*4(sp)
    sw x31, 31*4(sp)
    csrr t0, mscratch
    sw t0, 2*4(sp)
    csrr t0, mepc
    sw t0, 32*4(sp)
    mv s0, sp
    csrr a0, mcause
    mv a1, sp
    lw sp, 33*4(sp)
    call trap_handler
    mv sp, s0
    lw t0, 32*4(sp)
    csrw mepc, t0
    lw x1, 1*4(sp)
    lw x3, 3*4(sp)
    lw x4, 4*4(sp)
    lw x5, 5*4(sp)
    lw x6, 6*4(sp)
    lw x7, 7*4(sp)
    lw x8, 8*4(sp)
    lw x9, 9*4(sp)
    lw x10, 10*4(sp)
    lw x11, 11*4(sp)
    lw x12, 12*4(sp)
    lw x13, 13*4(sp)
    lw x14, 14*4(sp)
    lw x15, 15*4(sp)
    lw x16, 16*4(sp)
    lw x17, 17*4(sp)
    lw x18, 18*4(sp)
    lw x19, 19*4(sp)
    lw x20, 20*4(sp)
    lw x21, 21*4(sp)
    lw x22, 22*4(sp)
    lw x23, 23*4(sp)
    lw x24, 24*4(sp)
    lw x25, 25*4(sp)
    lw x26, 26*4(sp)
    lw x27, 27*4(sp)
    lw x28, 28*4(sp)
    lw x29, 29*4(sp)
    lw x30, 30*4(sp)
    lw x31, 31*4(sp)
    csrw mscratch, sp
    lw sp, 2*4(sp)
    mret
"
);

unsafe extern "C" {
    fn trap_entry();
}

#[unsafe(no_mangle)]
extern "C" fn trap_handler(mcause: usize, frame: &mut TrapFrame) {
    let hart = arch::hart_id();
    let Some(core) = core_of(PLATFORM, hart) else {
        panic!("trap on hart {} that is not a kernel core", hart);
    };
    let exit = kernel().lock().kernel_entry(core, mcause, frame);
    match exit {
        TrapExit::Resume { mode } => arch::set_return_mode(mode),
        TrapExit::Idle => idle(hart),
    }
}

/// 核心空闲：开中断等待下一次时钟中断
///
/// 下一次陷入会从内核栈顶重新开始，当前调用栈被丢弃。
pub fn idle(hart: usize) -> ! {
    let scratch = scratch_of(hart);
    // SAFETY: 陷入入口交换过 mscratch，这里换回陷入区域
    unsafe { core::arch::asm!("csrw mscratch, {}", in(reg) scratch) };
    arch::wait_for_interrupt()
}
