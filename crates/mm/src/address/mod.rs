//! 地址模块
//!
//! RV32 上地址和页号都是 32 位，但统一以 `usize` 承载。
//!
//! - [`Paddr`] / [`Vaddr`]: 物理 / 虚拟地址
//! - [`Ppn`] / [`Vpn`]: 物理 / 虚拟页号
//! - [`PageId`]: 动态页池中的页编号（相对 [`crate::config::APPS_PAGES_BASE`]）
//! - [`UsizeConvert`]: 与 `usize` 互相转换
//! - [`PageNum`]: 页号与地址之间的换算

pub mod page_num;
pub mod types;

pub use page_num::{PageId, PageNum, Ppn, Vpn, VpnRange};
pub use types::{Paddr, Vaddr};

/// 与 `usize` 互相转换
pub trait UsizeConvert: Copy {
    /// 取出原始值
    fn as_usize(&self) -> usize;
    /// 由原始值构造
    fn from_usize(value: usize) -> Self;
}
