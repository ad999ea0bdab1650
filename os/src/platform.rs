//! 编译期平台配置
//!
//! 平台由 `arty` feature 选择，日志级别由 `verbose` feature 选择。

use kernel::config::NCORES;
use log::LevelFilter;
use mm::Platform;

/// 目标平台
pub const PLATFORM: Platform = if cfg!(feature = "arty") {
    Platform::Arty
} else {
    Platform::Qemu
};

/// 日志级别上限
pub const LOG_LEVEL: LevelFilter = if cfg!(feature = "verbose") {
    LevelFilter::Debug
} else {
    LevelFilter::Info
};

/// 能启动的 hart 数上限（含 QEMU 上的监控核）
pub const MAX_HARTS: usize = NCORES + 1;

/// 第一个运行内核的 hart
///
/// QEMU sifive_u 的 0 号 hart 是没有 MMU 的 E51 监控核，
/// 应用核从 1 号开始；Arty 上从 0 号开始。
pub const fn first_hart(platform: Platform) -> usize {
    match platform {
        Platform::Arty => 0,
        Platform::Qemu => 1,
    }
}

/// hart 号到内核核心号，不参与调度的 hart 返回 `None`
pub const fn core_of(platform: Platform, hart: usize) -> Option<usize> {
    let first = first_hart(platform);
    if hart < first || hart - first >= NCORES {
        None
    } else {
        Some(hart - first)
    }
}

/// 内核核心号到 hart 号
pub const fn hart_of(platform: Platform, core: usize) -> usize {
    core + first_hart(platform)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qemu_skips_monitor_hart() {
        assert_eq!(core_of(Platform::Qemu, 0), None);
        assert_eq!(core_of(Platform::Qemu, 1), Some(0));
        assert_eq!(core_of(Platform::Qemu, NCORES), Some(NCORES - 1));
        assert_eq!(core_of(Platform::Qemu, NCORES + 1), None);
    }

    #[test]
    fn test_arty_starts_at_hart_zero() {
        assert_eq!(core_of(Platform::Arty, 0), Some(0));
        assert_eq!(core_of(Platform::Arty, NCORES), None);
    }

    #[test]
    fn test_hart_of_inverts_core_of() {
        for platform in [Platform::Arty, Platform::Qemu] {
            for core in 0..NCORES {
                assert_eq!(core_of(platform, hart_of(platform, core)), Some(core));
            }
        }
    }
}
