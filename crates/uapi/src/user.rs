//! 用户态系统调用入口：会合 IPC 与内核服务调用
//!
//! 仅在 RV32 目标上编译。调用方运行在自己的地址空间中，
//! [`SYSCALL_ARG`] 页已由装载器映射。

use core::arch::asm;

use crate::layout::SYSCALL_ARG;
use crate::{
    AbiError, AppArgs, KernelCall, KernelReply, Pid, Syscall, NCORES, SYSCALL_MSG_LEN, SYSCALL_SIZE,
};

fn syscall_page() -> &'static mut [u8] {
    // SAFETY: SYSCALL_ARG 在每个进程中都映射了一整页，且只有本进程访问
    unsafe { core::slice::from_raw_parts_mut(SYSCALL_ARG as *mut u8, SYSCALL_SIZE) }
}

fn trap(sc: &Syscall) -> Result<(), AbiError> {
    sc.encode(syscall_page())?;
    // SAFETY: ecall 陷入内核，返回时系统调用块已被内核处理
    unsafe { asm!("ecall", options(nostack)) };
    Ok(())
}

/// 向 `receiver` 发送消息，直到对方接收后才返回
pub fn sys_send(receiver: Pid, msg: &[u8]) -> Result<(), AbiError> {
    trap(&Syscall::send(receiver, msg)?)
}

/// 接收来自 `from`（或 [`crate::GPID_ALL`]）的消息
///
/// 返回真实发送者与拷入 `buf` 的字节数。
pub fn sys_recv(from: Pid, buf: &mut [u8]) -> Result<(Pid, usize), AbiError> {
    trap(&Syscall::recv(from))?;
    let done = Syscall::decode(syscall_page())?;
    let len = buf.len().min(SYSCALL_MSG_LEN);
    buf[..len].copy_from_slice(&done.content[..len]);
    Ok((done.sender, len))
}

fn kernel_call(call: &KernelCall) -> Result<KernelReply, AbiError> {
    trap(&call.to_syscall())?;
    KernelReply::read_from(&Syscall::decode(syscall_page())?)
}

/// 分配一个进程，失败时返回负数
pub fn proc_alloc() -> Result<Pid, AbiError> {
    Ok(kernel_call(&KernelCall::ProcAlloc)?.result)
}

/// 回收进程，[`crate::GPID_ALL`] 回收全部用户进程
pub fn proc_free(pid: Pid) -> Result<bool, AbiError> {
    Ok(kernel_call(&KernelCall::ProcFree(pid))?.is_ok())
}

/// 进程装载完毕
pub fn proc_set_ready(pid: Pid) -> Result<bool, AbiError> {
    Ok(kernel_call(&KernelCall::ProcSetReady(pid))?.is_ok())
}

/// 把内存中的 ELF 镜像装入 `pid`
pub fn proc_load(pid: Pid, image: &[u8], args: &AppArgs) -> Result<bool, AbiError> {
    let call = KernelCall::ProcLoad {
        pid,
        image: image.as_ptr() as usize,
        len: image.len(),
        args: args.clone(),
    };
    Ok(kernel_call(&call)?.is_ok())
}

/// 让 `pid` 睡眠 `usec` 微秒；普通进程只能让自己睡眠
pub fn sys_sleep(pid: Pid, usec: u32) -> Result<bool, AbiError> {
    Ok(kernel_call(&KernelCall::Sleep { pid, usec })?.is_ok())
}

/// 各核心正在运行的进程号
pub fn cores_info() -> Result<[Pid; NCORES], AbiError> {
    Ok(kernel_call(&KernelCall::CoresInfo)?.cores)
}
