//! 地址类型

use super::UsizeConvert;
use crate::config::PAGE_SIZE;

macro_rules! impl_address {
    ($type:ident) => {
        impl UsizeConvert for $type {
            fn as_usize(&self) -> usize {
                self.0
            }

            fn from_usize(value: usize) -> Self {
                Self(value)
            }
        }

        impl $type {
            /// 页内偏移
            #[inline]
            pub const fn page_offset(self) -> usize {
                self.0 & (PAGE_SIZE - 1)
            }

            /// 向下对齐到页边界
            #[inline]
            pub const fn align_down(self) -> Self {
                Self(self.0 & !(PAGE_SIZE - 1))
            }

            /// 是否页对齐
            #[inline]
            pub const fn is_aligned(self) -> bool {
                self.page_offset() == 0
            }

            /// 偏移 `bytes` 字节
            #[inline]
            pub const fn add(self, bytes: usize) -> Self {
                Self(self.0 + bytes)
            }
        }

        impl core::fmt::Display for $type {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{:#x}", self.0)
            }
        }
    };
}

/// 物理地址
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub struct Paddr(pub usize);
impl_address!(Paddr);

/// 虚拟地址
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub struct Vaddr(pub usize);
impl_address!(Vaddr);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_offset_and_align() {
        let va = Vaddr(0x8040_1234);
        assert_eq!(va.page_offset(), 0x234);
        assert_eq!(va.align_down(), Vaddr(0x8040_1000));
        assert!(!va.is_aligned());
        assert!(Paddr(0x8080_0000).is_aligned());
    }
}
