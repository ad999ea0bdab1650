//! earth 层设备驱动
//!
//! - [`Uart`]: 控制台串口，实现 [`kernel::Tty`]
//! - [`Clint`]: 核心本地中断器（mtime / mtimecmp）
//! - [`RomDisk`]: 内存映射的只读磁盘镜像，实现 [`kernel::BlockDevice`]

mod clint;
mod disk;
mod uart;

pub use clint::Clint;
pub use disk::RomDisk;
pub use uart::Uart;

use sync::SpinLock;

use crate::platform::PLATFORM;

/// 共享控制台，日志后端经由它输出
pub static CONSOLE: SpinLock<Uart> = SpinLock::new(Uart::new(PLATFORM));

#[inline]
fn reg(base: usize, offset: usize) -> *mut u32 {
    (base + offset) as *mut u32
}

/// 读 32 位设备寄存器
#[inline]
fn read_reg(base: usize, offset: usize) -> u32 {
    // SAFETY: base 为平台设备窗口，offset 为寄存器偏移
    unsafe { reg(base, offset).read_volatile() }
}

/// 写 32 位设备寄存器
#[inline]
fn write_reg(base: usize, offset: usize, value: u32) {
    // SAFETY: 同 read_reg
    unsafe { reg(base, offset).write_volatile(value) }
}
