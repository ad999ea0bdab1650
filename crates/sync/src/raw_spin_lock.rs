//! 屏蔽中断的自旋锁
//!
//! 获取时先关闭本地中断再自旋，释放时先放锁再恢复中断。
//! 被保存的中断状态放在锁内部：只有持锁者会读写它。

use core::hint;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use lock_api::{GuardNoSend, RawMutex};

use crate::intr_guard::IntrGuard;

/// 自旋锁的底层实现，不可重入
#[derive(Debug)]
pub struct RawSpinLock {
    locked: AtomicBool,
    saved_flags: AtomicUsize,
}

impl RawSpinLock {
    /// 创建一把未上锁的锁
    pub const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
            saved_flags: AtomicUsize::new(0),
        }
    }

    fn acquired(&self, guard: IntrGuard) {
        self.saved_flags.store(guard.into_flags(), Ordering::Relaxed);
    }
}

impl Default for RawSpinLock {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: locked 的 CAS 保证互斥，Acquire/Release 建立先行关系
unsafe impl RawMutex for RawSpinLock {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = Self::new();

    // 释放时要在同一核心上恢复中断
    type GuardMarker = GuardNoSend;

    fn lock(&self) {
        let guard = IntrGuard::new();
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            hint::spin_loop();
        }
        self.acquired(guard);
    }

    fn try_lock(&self) -> bool {
        let guard = IntrGuard::new();
        if self
            .locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            self.acquired(guard);
            true
        } else {
            // guard 在此处 drop，中断状态复原
            false
        }
    }

    unsafe fn unlock(&self) {
        let flags = self.saved_flags.load(Ordering::Relaxed);
        self.locked.store(false, Ordering::Release);
        // SAFETY: flags 来自 lock/try_lock 中的 IntrGuard
        unsafe { crate::arch_ops().restore_interrupts(flags) };
    }

    fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }
}

/// 屏蔽中断的自旋锁
///
/// 持锁期间本核心不响应中断，因此临界区应尽量短。
pub type SpinLock<T> = lock_api::Mutex<RawSpinLock, T>;

/// [`SpinLock`] 的 RAII 保护器
pub type SpinLockGuard<'a, T> = lock_api::MutexGuard<'a, RawSpinLock, T>;

#[cfg(test)]
mod tests {
    use super::*;
    use test_support::mock::arch::MOCK_ARCH_OPS;

    fn setup() {
        // SAFETY: 所有测试注册的是同一个 'static 实例
        unsafe { crate::register_arch_ops(&MOCK_ARCH_OPS) };
    }

    #[test]
    fn test_spin_lock_guards_data() {
        setup();
        let lock = SpinLock::new(0u32);
        {
            let mut value = lock.lock();
            *value += 1;
            assert!(lock.is_locked());
            assert!(lock.try_lock().is_none());
        }
        assert!(!lock.is_locked());
        assert_eq!(*lock.lock(), 1);
    }

    #[test]
    fn test_try_lock_succeeds_when_free() {
        setup();
        let lock = SpinLock::new([0u8; 4]);
        let guard = lock.try_lock();
        assert!(guard.is_some());
    }
}
