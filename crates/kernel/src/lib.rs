//! grass 内核核心
//!
//! 进程表、轮转调度、陷入处理和同步会合 IPC。所有入口都假定调用者
//! 已持有全局内核锁（见 `sync::KernelLock`），因此同一时刻只有一个
//! 核心在修改 [`Kernel`]，内部不再加锁。
//!
//! # 架构解耦
//!
//! CSR 与 CLINT 访问经过 [`hal::ArchKernelOps`]，内存访问经过
//! [`mm::Mmu`]，本 crate 不含任何汇编，可在宿主机上测试。

#![no_std]

extern crate alloc;

pub mod boot;
pub mod config;
pub mod hal;
mod ipc;
pub mod loader;
pub mod process;
pub mod sched;
mod service;
pub mod timer;
pub mod trap;

use alloc::boxed::Box;

use mm::Mmu;

pub use boot::{BootEntry, BootError};
pub use hal::{ArchKernelOps, BlockDevice, PrivMode, Tty, choose_translation};
pub use loader::LoadError;
pub use process::{ProcError, ProcStatus, Process, ProcessTable};
pub use sched::Schedule;
pub use service::ServiceError;
pub use timer::Timer;
pub use trap::{TrapCause, TrapExit, TrapFrame};

/// 内核状态
pub struct Kernel {
    mmu: Mmu,
    arch: Box<dyn ArchKernelOps>,
    timer: Timer,
    procs: ProcessTable,
}

impl Kernel {
    /// 在已初始化的 MMU 之上创建内核，时间片长度由平台决定
    pub fn new(mmu: Mmu, arch: Box<dyn ArchKernelOps>) -> Self {
        let timer = Timer::new(config::quantum(mmu.platform()));
        Self {
            mmu,
            arch,
            timer,
            procs: ProcessTable::new(),
        }
    }

    /// MMU 门面
    pub fn mmu(&self) -> &Mmu {
        &self.mmu
    }

    /// MMU 门面（可变）
    pub fn mmu_mut(&mut self) -> &mut Mmu {
        &mut self.mmu
    }

    /// 进程表
    pub fn procs(&self) -> &ProcessTable {
        &self.procs
    }

    /// 时间片定时器
    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    /// 当前 mtime
    pub fn now(&self) -> u64 {
        Timer::mtime(&*self.arch)
    }

    /// 关闭核心 `core` 的时钟中断，开中断之前调用
    pub fn timer_init(&self, core: usize) {
        self.timer.init(&*self.arch, core);
    }

    /// 为核心 `core` 重新装填一个时间片
    pub fn timer_reset(&self, core: usize) {
        self.timer.reset(&*self.arch, core);
    }
}
