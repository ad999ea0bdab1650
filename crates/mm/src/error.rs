//! 分页错误

use core::fmt;

use crate::address::{PageId, Vaddr};
use uapi::Pid;

/// 内存管理操作中可能发生的错误
///
/// 内核核心把这些错误视为不变量被破坏，一律升级为 panic；
/// 只有装载器等外围路径会把它们作为普通错误处理。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagingError {
    /// 动态页池耗尽
    OutOfMemory,
    /// 虚拟地址在该进程的页表中没有有效映射
    NotMapped(Pid, Vaddr),
    /// 地址或页编号越界
    InvalidAddress,
    /// 负数进程号不对应任何地址空间
    InvalidPid(Pid),
    /// 映射一个尚未分配的物理页
    NotAllocated(PageId),
    /// 映射一个属于其他进程的物理页
    NotOwner {
        /// 物理页
        page: PageId,
        /// 当前所有者
        owner: Pid,
        /// 请求者
        pid: Pid,
    },
    /// 进程还没有地址空间
    NoAddressSpace(Pid),
}

impl fmt::Display for PagingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory => write!(f, "no more free memory"),
            Self::NotMapped(pid, va) => write!(f, "{} is not mapped for pid {}", va, pid),
            Self::InvalidAddress => write!(f, "invalid address"),
            Self::InvalidPid(pid) => write!(f, "pid {} has no address space", pid),
            Self::NotAllocated(page) => write!(f, "page #{} is not allocated", page.0),
            Self::NotOwner { page, owner, pid } => write!(
                f,
                "page #{} belongs to pid {}, not pid {}",
                page.0, owner, pid
            ),
            Self::NoAddressSpace(pid) => write!(f, "pid {} has no address space", pid),
        }
    }
}

/// 分页操作的结果类型
pub type PagingResult<T> = Result<T, PagingError>;
