//! 软件 TLB
//!
//! 应用的虚拟地址与物理地址恒等，所有进程共享同一段物理窗口。
//! 任一时刻只有一个进程（`resident`）的页真正位于窗口中；
//! 切换时先把它的窗口内容写回各自的物理页，再把新进程的页拷入窗口。

use super::{MmContext, Translation};
use crate::address::{PageId, Paddr, Ppn, Vaddr, Vpn};
use crate::config::TranslationKind;
use crate::error::PagingResult;
use uapi::Pid;

/// 软件 TLB
#[derive(Debug, Default)]
pub struct SoftTlb {
    resident: Option<Pid>,
}

impl SoftTlb {
    /// 窗口为空
    pub const fn new() -> Self {
        Self { resident: None }
    }

    /// 当前驻留在窗口中的进程
    pub fn resident(&self) -> Option<Pid> {
        self.resident
    }
}

impl Translation for SoftTlb {
    fn kind(&self) -> TranslationKind {
        TranslationKind::SoftTlb
    }

    fn map(&mut self, cx: &mut MmContext<'_>, pid: Pid, vpn: Vpn, page: PageId) -> PagingResult<()> {
        // 驻留进程的窗口已经是最新内容，新页要立即可见
        if self.resident == Some(pid) {
            cx.ops.copy_page(Ppn(vpn.0), page.ppn());
        }
        Ok(())
    }

    fn switch(&mut self, cx: &mut MmContext<'_>, pid: Pid) -> PagingResult<()> {
        if self.resident == Some(pid) {
            return Ok(());
        }
        if let Some(prev) = self.resident {
            for (page, vpn) in cx.frames.resident_pages(prev) {
                cx.ops.copy_page(page.ppn(), Ppn(vpn.0));
            }
        }
        for (page, vpn) in cx.frames.resident_pages(pid) {
            cx.ops.copy_page(Ppn(vpn.0), page.ppn());
        }
        self.resident = Some(pid);
        Ok(())
    }

    fn translate(&mut self, cx: &mut MmContext<'_>, pid: Pid, va: Vaddr) -> PagingResult<Paddr> {
        self.switch(cx, pid)?;
        Ok(Paddr(va.0))
    }

    fn release(&mut self, pid: Pid) {
        if self.resident == Some(pid) {
            self.resident = None;
        }
    }
}
