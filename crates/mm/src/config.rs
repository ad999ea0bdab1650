//! 平台与内存布局配置
//!
//! ```text
//! 0x8000_0000  RAM_START        内核代码、数据与栈
//! 0x8040_0000  APPS_ENTRY       应用代码与数据
//! 0x8060_0000  APPS_ARG         启动参数
//! 0x8060_1000  SYSCALL_ARG      系统调用块
//! 0x8060_2000  WORK_DIR         工作目录页
//! 0x8080_0000  APPS_PAGES_BASE  动态页池（同时是应用栈顶）
//! 0x8100_0000  RAM_END
//! ```

pub use uapi::layout::{APPS_ARG, APPS_ENTRY, APPS_STACK_PAGES, APPS_STACK_TOP, SYSCALL_ARG, WORK_DIR};

/// 页大小
pub const PAGE_SIZE: usize = 4096;
/// 内存起始地址
pub const RAM_START: usize = 0x8000_0000;
/// 内存结束地址（16 MiB）
pub const RAM_END: usize = 0x8100_0000;
/// 动态页池起始地址
pub const APPS_PAGES_BASE: usize = 0x8080_0000;
/// 动态页池的页数
pub const APPS_PAGES_CNT: usize = (RAM_END - APPS_PAGES_BASE) / PAGE_SIZE;
/// 一个叶表覆盖的字节数
pub const LEAF_SPAN: usize = PAGE_SIZE * 1024;

/// Arty 板载 Flash，存放磁盘镜像
pub const BOARD_FLASH_ROM: usize = 0x2040_0000;
/// Arty 以太网控制器寄存器
pub const ETHMAC_CSR_BASE: usize = 0xF000_2000;
/// Arty 以太网接收缓冲区
pub const ETHMAC_RX_BUFFER: usize = 0x9000_0000;
/// Arty 以太网发送缓冲区
pub const ETHMAC_TX_BUFFER: usize = 0x9000_1000;

/// 运行平台
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Arty A7 FPGA 开发板
    Arty,
    /// QEMU sifive_u
    Qemu,
}

impl Platform {
    /// CLINT 基址
    pub const fn clint_base(self) -> usize {
        match self {
            Self::Arty => 0xF001_0000,
            Self::Qemu => 0x0200_0000,
        }
    }

    /// UART 基址
    pub const fn uart_base(self) -> usize {
        match self {
            Self::Arty => 0xF000_1000,
            Self::Qemu => 0x1001_0000,
        }
    }

    /// SPI 基址
    pub const fn spi_base(self) -> usize {
        match self {
            Self::Arty => 0xF000_8800,
            Self::Qemu => 0x1005_0000,
        }
    }

    /// 0 号地址空间需要恒等映射的设备窗口 `(基址, 页数)`
    ///
    /// 内存区域由调用方按 [`LEAF_SPAN`] 步长单独处理。
    pub fn device_windows(self) -> impl Iterator<Item = (usize, usize)> {
        let common = [
            (self.clint_base(), 16),
            (self.uart_base(), 1),
            (self.spi_base(), 1),
        ];
        let board: &'static [(usize, usize)] = match self {
            Self::Arty => &[
                (BOARD_FLASH_ROM, 1024),
                (ETHMAC_CSR_BASE, 1),
                (ETHMAC_TX_BUFFER, 1),
                (ETHMAC_RX_BUFFER, 1),
            ],
            Self::Qemu => &[],
        };
        common.into_iter().chain(board.iter().copied())
    }
}

/// 地址翻译机制
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationKind {
    /// Sv32 页表
    PageTable,
    /// 软件 TLB（换入换出共享窗口）
    SoftTlb,
}

impl core::fmt::Display for TranslationKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::PageTable => write!(f, "Page table"),
            Self::SoftTlb => write!(f, "Software"),
        }
    }
}
