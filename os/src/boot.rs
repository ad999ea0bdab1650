//! 启动
//!
//! 所有 hart 从 `_start` 进入，各自使用一段启动栈，这段栈之后也是该 hart 的内核栈。
//! 第一个抢到 [`BOOT_STATE`] 的核心完成 earth 初始化并进入 grass 层，
//! 其余核心等到 [`READY`] 后装好时钟并空闲。

use alloc::boxed::Box;
use core::arch::{asm, global_asm};
use core::hint;
use core::sync::atomic::{AtomicUsize, Ordering};

use kernel::{BootEntry, Kernel, choose_translation};
use mm::Mmu;
use once_cell::race::OnceBox;
use sync::KernelLock;

use crate::arch::{self, KernelArch, SYNC_ARCH_OPS};
use crate::drivers::{CONSOLE, Clint, RomDisk, Uart};
use crate::heap::{self, HEAP_SIZE};
use crate::logging;
use crate::mem::PhysMem;
use crate::platform::{MAX_HARTS, PLATFORM, core_of};
use crate::trap;

const STACK_SIZE: usize = 16 * 1024;

// 不在 sbss..ebss 范围内，清零 bss 时其它 hart 仍在使用自己的栈
#[unsafe(link_section = ".bss.stack")]
static mut BOOT_STACKS: [[u8; STACK_SIZE]; MAX_HARTS] = [[0; STACK_SIZE]; MAX_HARTS];

// 初值非零，位于 .data，不受清零影响
const UNCLAIMED: usize = 1;
const BOOTING: usize = 2;
const READY: usize = 3;

static BOOT_STATE: AtomicUsize = AtomicUsize::new(UNCLAIMED);

static KERNEL: OnceBox<KernelLock<Kernel>> = OnceBox::new();

global_asm!(
    "
    .section .text.entry
    .globl _start
_start:
    csrw mie, zero
    csrr a0, mhartid
    li t0, {max_harts}
    bgeu a0, t0, 1f
    la sp, {stacks}
    li t0, {stack_size}
    addi t1, a0, 1
    mul t1, t1, t0
    add sp, sp, t1
    call {main}
1:
    wfi
    j 1b
    ",
    max_harts = const MAX_HARTS,
    stacks = sym BOOT_STACKS,
    stack_size = const STACK_SIZE,
    main = sym rust_main,
);

/// 全局内核状态
pub fn kernel() -> &'static KernelLock<Kernel> {
    match KERNEL.get() {
        Some(kernel) => kernel,
        None => panic!("kernel used before grass_entry"),
    }
}

fn stack_top(hart: usize) -> usize {
    (&raw const BOOT_STACKS) as usize + (hart + 1) * STACK_SIZE
}

extern "C" fn rust_main(hart: usize) -> ! {
    let Some(core) = core_of(PLATFORM, hart) else {
        arch::halt()
    };
    if BOOT_STATE
        .compare_exchange(UNCLAIMED, BOOTING, Ordering::AcqRel, Ordering::Acquire)
        .is_ok()
    {
        boot_core(hart, core)
    } else {
        while BOOT_STATE.load(Ordering::Acquire) != READY {
            hint::spin_loop();
        }
        secondary_core(hart, core)
    }
}

fn clear_bss() {
    unsafe extern "C" {
        static mut sbss: u8;
        static mut ebss: u8;
    }
    let start = (&raw mut sbss) as usize;
    let end = (&raw mut ebss) as usize;
    // SAFETY: 其它 hart 在 READY 之前只使用 .bss.stack 和 .data
    unsafe { core::ptr::write_bytes(start as *mut u8, 0, end - start) };
}

fn init_interrupts(kernel: &Kernel, hart: usize, core: usize) {
    kernel.timer_init(core);
    trap::install_scratch(hart, stack_top(hart));
    arch::init_trap_vector(trap::entry());
}

fn boot_core(hart: usize, core: usize) -> ! {
    clear_bss();
    // SAFETY: 此时只有本 hart 在运行内核代码
    unsafe { sync::register_arch_ops(&SYNC_ARCH_OPS) };
    CONSOLE.lock().init();
    logging::init();
    log::info!("Enter the earth layer on hart {} ({:?})", hart, PLATFORM);
    log::debug!("heap: {} KiB at {:#x}", HEAP_SIZE / 1024, heap::base());

    arch::init_pmp();
    let kind = choose_translation(&mut Uart::new(PLATFORM));
    let mut mmu = Mmu::new(Box::new(PhysMem), PLATFORM, kind);
    if let Err(err) = mmu.init_kernel_space() {
        panic!("earth: kernel address space: {}", err);
    }
    let mut kernel = Kernel::new(mmu, Box::new(KernelArch::new(Clint::new(PLATFORM))));
    init_interrupts(&kernel, hart, core);
    log::info!("Use direct mode and put the address of trap_entry into mtvec");

    let entry = match kernel.grass_entry(core, &mut RomDisk::new()) {
        Ok(entry) => entry,
        Err(err) => panic!("grass: {}", err),
    };
    kernel.timer_reset(core);
    if KERNEL.set(Box::new(KernelLock::new(kernel))).is_err() {
        panic!("kernel initialised twice");
    }
    BOOT_STATE.store(READY, Ordering::Release);
    enter(entry)
}

fn secondary_core(hart: usize, core: usize) -> ! {
    arch::init_pmp();
    {
        let kernel = kernel().lock();
        init_interrupts(&kernel, hart, core);
        kernel.timer_reset(core);
    }
    log::info!("core #{} (hart {}) waits for the timer", core, hart);
    trap::idle(hart)
}

/// mret 进入第一个进程
fn enter(entry: BootEntry) -> ! {
    arch::set_return_mode(entry.mode);
    // SAFETY: 进程的地址空间已切换，陷入向量与 mscratch 已设置
    unsafe {
        asm!(
            "csrw mepc, {entry}",
            "mret",
            entry = in(reg) entry.entry,
            in("a0") entry.arg,
            options(noreturn),
        )
    }
}
