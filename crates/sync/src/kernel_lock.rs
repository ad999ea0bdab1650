//! 全局内核锁
//!
//! 与 [`crate::SpinLock`] 不同，它不碰中断：陷入处理程序运行时
//! 硬件已经关闭了本核心的中断，空闲核心则要在放锁之后才打开中断等待时钟。

use core::hint;
use core::sync::atomic::{AtomicBool, Ordering};

use lock_api::{GuardSend, RawMutex};

/// 忙等锁，不可重入
#[derive(Debug)]
pub struct RawKernelLock {
    locked: AtomicBool,
}

impl RawKernelLock {
    /// 创建一把未上锁的锁
    pub const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
        }
    }
}

impl Default for RawKernelLock {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: test-and-set 保证互斥
unsafe impl RawMutex for RawKernelLock {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = Self::new();

    type GuardMarker = GuardSend;

    fn lock(&self) {
        while self.locked.swap(true, Ordering::Acquire) {
            while self.locked.load(Ordering::Relaxed) {
                hint::spin_loop();
            }
        }
    }

    fn try_lock(&self) -> bool {
        !self.locked.swap(true, Ordering::Acquire)
    }

    unsafe fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }

    fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }
}

/// 以 [`RawKernelLock`] 保护的数据
pub type KernelLock<T> = lock_api::Mutex<RawKernelLock, T>;

/// [`KernelLock`] 的 RAII 保护器
pub type KernelLockGuard<'a, T> = lock_api::MutexGuard<'a, RawKernelLock, T>;
