//! 与用户空间共用定义和声明
//!
//! grass 内核与应用之间唯一的约定就是本 crate：
//! - [`types`]: 进程号与系统服务进程号
//! - [`layout`]: 用户可见的固定虚拟地址（入口、参数页、系统调用页、栈顶）
//! - [`syscall`]: 系统调用块（send/recv 会合 IPC 的线上格式）
//! - [`proc`]: 发往进程管理服务的请求/应答，以及应用启动参数块
//! - [`service`]: 进程管理服务使用的内核服务调用
//!
//! 所有结构体都以小端序、4 字节字段编码，与 RV32 上 C 布局一致。

#![no_std]

mod error;

pub mod layout;
pub mod proc;
pub mod service;
pub mod syscall;
pub mod types;
#[cfg(target_arch = "riscv32")]
pub mod user;

pub use error::AbiError;
pub use service::{KernelCall, KernelReply};
pub use proc::{AppArgs, ProcReply, ProcRequest, ProcRequestType, CMD_ARG_LEN, CMD_NARGS};
pub use syscall::{Syscall, SyscallStatus, SyscallType, SYSCALL_MSG_LEN, SYSCALL_SIZE};
pub use types::*;

/// 从 `bytes[offset..offset + 4]` 读取一个小端 u32
#[inline]
pub(crate) fn read_u32(bytes: &[u8], offset: usize) -> Result<u32, AbiError> {
    let raw = bytes.get(offset..offset + 4).ok_or(AbiError::Truncated)?;
    Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

/// 将 `value` 以小端序写入 `bytes[offset..offset + 4]`
#[inline]
pub(crate) fn write_u32(bytes: &mut [u8], offset: usize, value: u32) {
    bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}
