//! 同步原语
//!
//! 内核只需要两种锁：
//! - [`KernelLock`]: 全局内核锁。陷入时获取，回到用户程序或核心空闲时释放，
//!   保证任一时刻至多一个核心在执行内核逻辑。它是粗粒度的忙等锁，不屏蔽中断
//!   （持有期间本核心的中断本来就是关闭的）。
//! - [`SpinLock`]: 保护少量跨核共享的设备状态（如串口），获取时屏蔽本地中断。
//!
//! 两者都实现 [`lock_api::RawMutex`]，数据封装交给 `lock_api::Mutex`。
//!
//! # 架构依赖
//!
//! [`SpinLock`] 通过 [`ArchOps`] 开关中断，使用前必须调用 [`register_arch_ops`]。

#![no_std]

mod intr_guard;
mod kernel_lock;
mod raw_spin_lock;

pub use intr_guard::IntrGuard;
pub use kernel_lock::{KernelLock, KernelLockGuard, RawKernelLock};
pub use raw_spin_lock::{RawSpinLock, SpinLock, SpinLockGuard};

use core::sync::atomic::{AtomicUsize, Ordering};

/// 架构相关操作
///
/// 由 os crate 实现并注册。
pub trait ArchOps: Send + Sync {
    /// 读取并关闭本地中断，返回之前的状态
    ///
    /// # Safety
    /// 返回值只能交给 [`ArchOps::restore_interrupts`]
    unsafe fn read_and_disable_interrupts(&self) -> usize;

    /// 恢复中断状态
    ///
    /// # Safety
    /// `flags` 必须来自 [`ArchOps::read_and_disable_interrupts`]
    unsafe fn restore_interrupts(&self, flags: usize);

    /// 中断使能位（RV32 机器模式下为 mstatus.MIE）
    fn interrupt_enable_bit(&self) -> usize;

    /// 当前核心号
    fn hart_id(&self) -> usize;
}

// 胖指针拆成数据指针和虚表指针两部分保存
static ARCH_OPS_DATA: AtomicUsize = AtomicUsize::new(0);
static ARCH_OPS_VTABLE: AtomicUsize = AtomicUsize::new(0);

/// 注册架构操作实现
///
/// 重复注册会覆盖之前的实现。
///
/// # Safety
/// 必须在任何 [`SpinLock`] 被使用之前调用
pub unsafe fn register_arch_ops(ops: &'static dyn ArchOps) {
    let ptr = ops as *const dyn ArchOps;
    // SAFETY: `*const dyn Trait` 的布局为 (data, vtable)
    let (data, vtable) = unsafe { core::mem::transmute::<*const dyn ArchOps, (usize, usize)>(ptr) };
    ARCH_OPS_VTABLE.store(vtable, Ordering::Release);
    ARCH_OPS_DATA.store(data, Ordering::Release);
}

/// 获取已注册的架构操作
#[inline]
pub(crate) fn arch_ops() -> &'static dyn ArchOps {
    let data = ARCH_OPS_DATA.load(Ordering::Acquire);
    let vtable = ARCH_OPS_VTABLE.load(Ordering::Acquire);
    if data == 0 {
        panic!("sync: ArchOps not registered, call register_arch_ops first");
    }
    // SAFETY: 两部分都来自 register_arch_ops 中的同一个 'static 引用
    unsafe { &*core::mem::transmute::<(usize, usize), *const dyn ArchOps>((data, vtable)) }
}

#[cfg(test)]
mod mock {
    use test_support::mock::arch::MockArchOps;

    impl crate::ArchOps for MockArchOps {
        unsafe fn read_and_disable_interrupts(&self) -> usize {
            self.disable_interrupts()
        }

        unsafe fn restore_interrupts(&self, flags: usize) {
            self.restore(flags)
        }

        fn interrupt_enable_bit(&self) -> usize {
            MockArchOps::MIE
        }

        fn hart_id(&self) -> usize {
            self.hart()
        }
    }
}
