//! 物理页分配器
//!
//! 动态页池 `[APPS_PAGES_BASE, RAM_END)` 中每页对应一个 [`PageState`]。
//! 分配只把页标记为已用；第一次 [`FrameAllocator::assign`] 才确定所有者，
//! 之后只有所有者能再次映射它。进程结束时 [`FrameAllocator::free`]
//! 一次性回收其名下所有页。

use alloc::vec;
use alloc::vec::Vec;

use crate::address::{PageId, Vpn};
use crate::config::APPS_PAGES_CNT;
use crate::error::{PagingError, PagingResult};
use uapi::Pid;

/// 单个物理页的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageState {
    /// 空闲
    #[default]
    Free,
    /// 已分配
    Used {
        /// 所有者，分配后尚未映射时为 `None`
        owner: Option<Pid>,
        /// 所有者地址空间中映射到此页的虚拟页
        vpn: Option<Vpn>,
    },
}

impl PageState {
    /// 是否已分配
    pub fn in_use(&self) -> bool {
        matches!(self, Self::Used { .. })
    }

    /// 所有者
    pub fn owner(&self) -> Option<Pid> {
        match self {
            Self::Used { owner, .. } => *owner,
            Self::Free => None,
        }
    }
}

/// 首次适配的物理页分配器
pub struct FrameAllocator {
    pages: Vec<PageState>,
}

impl FrameAllocator {
    /// 管理整个动态页池
    pub fn new() -> Self {
        Self::with_capacity(APPS_PAGES_CNT)
    }

    /// 只管理前 `count` 页（测试用）
    pub fn with_capacity(count: usize) -> Self {
        Self {
            pages: vec![PageState::Free; count.min(APPS_PAGES_CNT)],
        }
    }

    /// 分配第一个空闲页
    pub fn alloc(&mut self) -> PagingResult<PageId> {
        let idx = self
            .pages
            .iter()
            .position(|p| !p.in_use())
            .ok_or(PagingError::OutOfMemory)?;
        self.pages[idx] = PageState::Used {
            owner: None,
            vpn: None,
        };
        Ok(PageId(idx))
    }

    /// 分配一页并直接记在 `pid` 名下（页表等内部用途）
    pub fn alloc_for(&mut self, pid: Pid) -> PagingResult<PageId> {
        let page = self.alloc()?;
        self.pages[page.0] = PageState::Used {
            owner: Some(pid),
            vpn: None,
        };
        Ok(page)
    }

    /// 记录 `pid` 的虚拟页 `vpn` 映射到 `page`
    ///
    /// 拒绝未分配的页和属于其他进程的页。
    pub fn assign(&mut self, page: PageId, pid: Pid, vpn: Vpn) -> PagingResult<()> {
        let state = self
            .pages
            .get_mut(page.0)
            .ok_or(PagingError::InvalidAddress)?;
        match *state {
            PageState::Free => Err(PagingError::NotAllocated(page)),
            PageState::Used {
                owner: Some(owner), ..
            } if owner != pid => Err(PagingError::NotOwner { page, owner, pid }),
            PageState::Used { .. } => {
                *state = PageState::Used {
                    owner: Some(pid),
                    vpn: Some(vpn),
                };
                Ok(())
            }
        }
    }

    /// 回收 `pid` 名下的所有页，返回回收的页数
    pub fn free(&mut self, pid: Pid) -> usize {
        let mut freed = 0;
        for state in self.pages.iter_mut().filter(|p| p.owner() == Some(pid)) {
            *state = PageState::Free;
            freed += 1;
        }
        freed
    }

    /// 查询单页状态
    pub fn state(&self, page: PageId) -> Option<PageState> {
        self.pages.get(page.0).copied()
    }

    /// `pid` 名下且已映射的 `(物理页, 虚拟页)`
    pub fn resident_pages(&self, pid: Pid) -> impl Iterator<Item = (PageId, Vpn)> + '_ {
        self.pages
            .iter()
            .enumerate()
            .filter_map(move |(idx, state)| match *state {
                PageState::Used {
                    owner: Some(owner),
                    vpn: Some(vpn),
                } if owner == pid => Some((PageId(idx), vpn)),
                _ => None,
            })
    }

    /// 已分配页数
    pub fn used_count(&self) -> usize {
        self.pages.iter().filter(|p| p.in_use()).count()
    }

    /// 总页数
    pub fn capacity(&self) -> usize {
        self.pages.len()
    }
}

impl Default for FrameAllocator {
    fn default() -> Self {
        Self::new()
    }
}
