//! 内核常量

use mm::Platform;

/// 进程表槽位数
pub const MAX_NPROCESS: usize = 16;
pub use uapi::NCORES;
/// 保存的通用寄存器个数（x0..x31）
pub const SAVED_REGISTER_NUM: usize = 32;

/// mcause 最高位：1 表示中断
pub const MCAUSE_INTERRUPT: usize = 1 << 31;
/// 中断号掩码
pub const INTR_CODE_MASK: usize = 0x3FF;
/// 机器模式时钟中断
pub const INTR_ID_TIMER: usize = 7;
/// 用户模式 ecall
pub const EXCP_ID_ECALL_U: usize = 8;
/// 机器模式 ecall
pub const EXCP_ID_ECALL_M: usize = 11;

/// 磁盘块大小
pub const BLOCK_SIZE: usize = 512;
/// 每个系统程序镜像在磁盘上占用的字节数
pub const SYS_EXEC_SIZE: usize = 256 * 1024;
/// 进程管理服务镜像的起始块号（紧随 grass 镜像之后）
pub const SYS_PROC_EXEC_START: u32 = (SYS_EXEC_SIZE / BLOCK_SIZE) as u32;

/// 时间片长度（mtime 计数）
pub const fn quantum(platform: Platform) -> u64 {
    match platform {
        Platform::Arty => 50_000_000,
        Platform::Qemu => 500_000,
    }
}
