//! Loam 内核镜像
//!
//! earth 层（内存与设备）与 grass 层（进程、调度、IPC）运行在 RV32 机器模式。
//! 库 crate 只通过硬件 trait 接触寄存器，这里给出它们在真实硬件上的实现，
//! 以及启动代码、陷入向量、堆和日志后端。
//!
//! # 启动流程
//!
//! 1. `_start` 为每个 hart 设置启动栈，跳转到 [`rust_main`]
//! 2. 第一个到达的核心完成 earth 初始化：清零 bss、堆、日志、PMP、
//!    交互选择翻译机制、建立内核地址空间
//! 3. 该核心进入 grass 层，装载并以机器模式进入进程管理服务（pid 1）
//! 4. 其余核心等待初始化完成，装好时钟后空闲，等时钟中断参与调度
//!
//! 非 RV32 目标上只编译出与平台无关的部分，便于宿主机单元测试。

#![cfg_attr(target_arch = "riscv32", no_std)]
#![cfg_attr(target_arch = "riscv32", no_main)]
#![cfg_attr(not(target_arch = "riscv32"), allow(dead_code))]

#[cfg(target_arch = "riscv32")]
extern crate alloc;

mod logging;
mod platform;

#[cfg(target_arch = "riscv32")]
mod arch;
#[cfg(target_arch = "riscv32")]
mod boot;
#[cfg(target_arch = "riscv32")]
mod drivers;
#[cfg(target_arch = "riscv32")]
mod heap;
#[cfg(target_arch = "riscv32")]
mod mem;
#[cfg(target_arch = "riscv32")]
mod trap;

#[cfg(target_arch = "riscv32")]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    if let Some(location) = info.location() {
        logging::emergency(format_args!(
            "Panicked at {}:{} {}",
            location.file(),
            location.line(),
            info.message()
        ));
    } else {
        logging::emergency(format_args!("Panicked: {}", info.message()));
    }
    arch::halt()
}

#[cfg(not(target_arch = "riscv32"))]
fn main() {
    println!(
        "os: build for a riscv32 target, e.g. `cargo build -p os --target riscv32imac-unknown-none-elf` ({:?})",
        platform::PLATFORM
    );
}
