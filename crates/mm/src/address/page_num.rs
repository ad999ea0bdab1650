//! 页号
//!
//! Sv32 把 20 位虚拟页号拆成两级索引：`vpn1 = va[31:22]` 选根表项，
//! `vpn0 = va[21:12]` 选叶表项，每级 1024 项。

use super::{Paddr, UsizeConvert, Vaddr};
use crate::config::{APPS_PAGES_BASE, APPS_PAGES_CNT, PAGE_SIZE};

/// 页号与地址之间的换算
pub trait PageNum: UsizeConvert + PartialEq + PartialOrd {
    /// 关联的地址类型
    type TAddress: UsizeConvert;

    /// 包含 `addr` 的页（向下取整）
    fn from_addr_floor(addr: Self::TAddress) -> Self {
        Self::from_usize(addr.as_usize() / PAGE_SIZE)
    }

    /// 页的起始地址
    fn start_addr(self) -> Self::TAddress {
        Self::TAddress::from_usize(self.as_usize() * PAGE_SIZE)
    }
}

macro_rules! impl_page_num {
    ($type:ident, $addr_type:ty) => {
        impl UsizeConvert for $type {
            fn as_usize(&self) -> usize {
                self.0
            }

            fn from_usize(value: usize) -> Self {
                Self(value)
            }
        }

        impl PageNum for $type {
            type TAddress = $addr_type;
        }
    };
}

/// 物理页号
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Ppn(pub usize);
impl_page_num!(Ppn, Paddr);

/// 虚拟页号
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Vpn(pub usize);
impl_page_num!(Vpn, Vaddr);

impl Vpn {
    /// 根表索引
    #[inline]
    pub const fn vpn1(self) -> usize {
        (self.0 >> 10) & 0x3FF
    }

    /// 叶表索引
    #[inline]
    pub const fn vpn0(self) -> usize {
        self.0 & 0x3FF
    }
}

/// 动态页池中的页编号
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct PageId(pub usize);

impl PageId {
    /// 页的物理起始地址
    #[inline]
    pub const fn paddr(self) -> Paddr {
        Paddr(APPS_PAGES_BASE + self.0 * PAGE_SIZE)
    }

    /// 对应的物理页号
    #[inline]
    pub const fn ppn(self) -> Ppn {
        Ppn(self.paddr().0 / PAGE_SIZE)
    }

    /// 由池内物理页号反查编号，不在池内时返回 `None`
    pub const fn from_ppn(ppn: Ppn) -> Option<Self> {
        let base = APPS_PAGES_BASE / PAGE_SIZE;
        if ppn.0 >= base && ppn.0 < base + APPS_PAGES_CNT {
            Some(Self(ppn.0 - base))
        } else {
            None
        }
    }
}

/// 半开区间 `[start, end)` 的虚拟页号范围
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VpnRange {
    /// 起始页号（包含）
    pub start: Vpn,
    /// 结束页号（不包含）
    pub end: Vpn,
}

impl VpnRange {
    /// 覆盖 `[start, start + len)` 字节的最小页范围
    pub fn covering(start: Vaddr, len: usize) -> Self {
        let first = Vpn::from_addr_floor(start);
        let last = (start.0 + len).div_ceil(PAGE_SIZE);
        Self {
            start: first,
            end: Vpn(last.max(first.0)),
        }
    }

    /// 页数
    pub fn len(&self) -> usize {
        self.end.0 - self.start.0
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// 按升序遍历
    pub fn iter(&self) -> impl Iterator<Item = Vpn> + use<> {
        (self.start.0..self.end.0).map(Vpn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sv32_indices() {
        let vpn = Vpn::from_addr_floor(Vaddr(0x8060_2000));
        assert_eq!(vpn.vpn1(), 0x201);
        assert_eq!(vpn.vpn0(), 0x002);
    }

    #[test]
    fn test_page_id_addresses() {
        assert_eq!(PageId(0).paddr(), Paddr(0x8080_0000));
        assert_eq!(PageId(2).paddr(), Paddr(0x8080_2000));
        assert_eq!(PageId::from_ppn(PageId(7).ppn()), Some(PageId(7)));
        assert_eq!(PageId::from_ppn(Ppn(0x80000)), None);
    }

    #[test]
    fn test_range_covering() {
        let r = VpnRange::covering(Vaddr(0x8040_0ff0), 0x20);
        assert_eq!(r.len(), 2);
        assert!(VpnRange::covering(Vaddr(0x8040_0000), 0).is_empty());
        assert!(r.iter().eq([Vpn(0x80400), Vpn(0x80401)]));
    }
}
