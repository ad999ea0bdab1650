//! 中断保护器
//!
//! 只能阻止本核心上的中断打断临界区，其他核心的并行访问仍需要锁。

use crate::arch_ops;

/// 创建时关闭本地中断，销毁时恢复到之前的状态
///
/// ```ignore
/// {
///     let _guard = IntrGuard::new();
///     // 本核心不会被中断
/// }
/// ```
pub struct IntrGuard {
    flags: usize,
}

impl IntrGuard {
    /// 关闭本地中断
    pub fn new() -> Self {
        // SAFETY: flags 只会在 drop 时交还给 restore_interrupts
        let flags = unsafe { arch_ops().read_and_disable_interrupts() };
        Self { flags }
    }

    /// 进入临界区之前中断是否开启
    pub fn was_enabled(&self) -> bool {
        self.flags & arch_ops().interrupt_enable_bit() != 0
    }

    /// 放弃恢复责任，交出保存的状态
    pub(crate) fn into_flags(self) -> usize {
        let flags = self.flags;
        core::mem::forget(self);
        flags
    }
}

impl Default for IntrGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for IntrGuard {
    fn drop(&mut self) {
        // SAFETY: flags 来自 new()
        unsafe { arch_ops().restore_interrupts(self.flags) };
    }
}
