//! 硬件抽象
//!
//! 内核核心只通过这里的 trait 接触 CSR、CLINT 和外设，
//! os crate 为 RV32 实现它们，测试中使用模拟实现。

use mm::TranslationKind;

/// 内核需要的 CSR / CLINT 操作
pub trait ArchKernelOps: Send + Sync {
    /// mtime 高 32 位
    fn mtime_hi(&self) -> u32;

    /// mtime 低 32 位
    fn mtime_lo(&self) -> u32;

    /// 设置核心 `core` 的 mtimecmp
    fn set_mtimecmp(&self, core: usize, value: u64);

    /// 最近一次异常的附加信息（mtval）
    fn fault_addr(&self) -> usize;

    /// 当前 satp 原始值
    fn page_table_base(&self) -> usize;
}

/// mret 之后进入的特权级
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivMode {
    /// 机器模式（mstatus.MPP = 3）
    Machine,
    /// 用户模式（mstatus.MPP = 0）
    User,
}

impl PrivMode {
    /// 翻译机制决定进程运行的特权级：页表只在用户模式下生效
    pub fn for_translation(kind: TranslationKind) -> Self {
        match kind {
            TranslationKind::PageTable => Self::User,
            TranslationKind::SoftTlb => Self::Machine,
        }
    }
}

/// 终端
pub trait Tty {
    /// 阻塞读取一个字节
    fn read_byte(&mut self) -> u8;

    /// 写出一个字节
    fn write_byte(&mut self, byte: u8);

    /// 写出字符串
    fn write_str(&mut self, s: &str) {
        for b in s.bytes() {
            self.write_byte(b);
        }
    }
}

/// 块设备，块大小为 [`crate::config::BLOCK_SIZE`]
pub trait BlockDevice {
    /// 从 `block` 开始读取 `dst.len() / BLOCK_SIZE` 块
    fn read_blocks(&mut self, block: u32, dst: &mut [u8]);

    /// 从 `block` 开始写入 `src.len() / BLOCK_SIZE` 块
    fn write_blocks(&mut self, block: u32, src: &[u8]);
}

/// 交互式选择翻译机制：'0' 为页表，'1' 为软件 TLB，其他输入被忽略
pub fn choose_translation(tty: &mut dyn Tty) -> TranslationKind {
    tty.write_str("Choose a memory translation mechanism:\r\n");
    tty.write_str("Enter 0: page tables\r\nEnter 1: software TLB\r\n");
    let kind = loop {
        match tty.read_byte() {
            b'0' => break TranslationKind::PageTable,
            b'1' => break TranslationKind::SoftTlb,
            _ => continue,
        }
    };
    log::info!("{} translation is chosen", kind);
    kind
}
