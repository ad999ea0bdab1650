//! ELF 装载
//!
//! 每个系统程序在磁盘上占 [`SYS_EXEC_SIZE`] 字节。装载时把每个 PT_LOAD
//! 段逐页分配、清零、拷贝并映射到进程，再映射参数页、系统调用页和用户栈。

use alloc::collections::BTreeMap;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use mm::address::{PageId, PageNum, Vaddr, Vpn, VpnRange};
use mm::config::PAGE_SIZE;
use mm::{Mmu, PagingError};
use uapi::layout::{APPS_ARG, APPS_ENTRY, APPS_STACK_PAGES, APPS_STACK_TOP, SYSCALL_ARG};
use uapi::{AppArgs, Pid};
use xmas_elf::{
    ElfFile,
    header::{self, HeaderPt2, Machine},
    program,
};

use crate::config::{BLOCK_SIZE, SYS_EXEC_SIZE};
use crate::hal::BlockDevice;

/// 装载错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadError {
    /// 不是合法的 ELF
    Elf(&'static str),
    /// 不是 RV32 可执行文件
    NotRiscv32,
    /// 段不在 `[APPS_ENTRY, APPS_ARG)` 之内
    SegmentOutOfRange {
        /// 段起始虚拟地址
        start: usize,
        /// 段结束虚拟地址
        end: usize,
    },
    /// 分配或映射失败
    Paging(PagingError),
}

impl From<PagingError> for LoadError {
    fn from(err: PagingError) -> Self {
        Self::Paging(err)
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Elf(msg) => write!(f, "bad elf: {}", msg),
            Self::NotRiscv32 => write!(f, "not a riscv32 executable"),
            Self::SegmentOutOfRange { start, end } => {
                write!(f, "segment [{:#x}, {:#x}) out of the code region", start, end)
            }
            Self::Paging(err) => write!(f, "{}", err),
        }
    }
}

/// 从 `start_block` 起读出一个系统程序镜像
pub fn read_image(disk: &mut dyn BlockDevice, start_block: u32) -> Vec<u8> {
    let mut image = vec![0u8; SYS_EXEC_SIZE];
    for (i, block) in image.chunks_mut(BLOCK_SIZE).enumerate() {
        disk.read_blocks(start_block + i as u32, block);
    }
    image
}

/// `[base, base + len)`，超出 32 位时为 `None`
fn segment_span(base: u64, len: u64) -> Option<(usize, usize)> {
    let base = u32::try_from(base).ok()?;
    let end = base.checked_add(u32::try_from(len).ok()?)?;
    Some((base as usize, end as usize))
}

/// 把 `image` 装入 `pid` 的地址空间，返回入口地址
pub fn load_elf(mmu: &mut Mmu, pid: Pid, image: &[u8], args: &AppArgs) -> Result<usize, LoadError> {
    let elf = ElfFile::new(image).map_err(LoadError::Elf)?;
    let entry = match elf.header.pt2 {
        HeaderPt2::Header32(pt2)
            if pt2.type_.as_type() == header::Type::Executable
                && pt2.machine.as_machine() == Machine::RISC_V =>
        {
            pt2.entry_point as usize
        }
        _ => return Err(LoadError::NotRiscv32),
    };

    // 两个段可能落在同一页上
    let mut pages: BTreeMap<Vpn, PageId> = BTreeMap::new();
    for ph in elf.program_iter() {
        if !matches!(ph.get_type(), Ok(program::Type::Load)) {
            continue;
        }
        // 按 32 位地址空间检查溢出
        let (start, end) = segment_span(ph.virtual_addr(), ph.mem_size())
            .ok_or(LoadError::Elf("segment wraps the address space"))?;
        let (off_file, end_file) = segment_span(ph.offset(), ph.file_size())
            .ok_or(LoadError::Elf("segment beyond end of image"))?;
        let len_file = end_file - off_file;
        if start < APPS_ENTRY || end > APPS_ARG || len_file > end - start {
            return Err(LoadError::SegmentOutOfRange { start, end });
        }
        let data = image
            .get(off_file..end_file)
            .ok_or(LoadError::Elf("segment beyond end of image"))?;

        for vpn in VpnRange::covering(Vaddr(start), end - start).iter() {
            let page = match pages.get(&vpn) {
                Some(&page) => page,
                None => {
                    let page = mmu.alloc()?;
                    mmu.zero_page(page);
                    mmu.map(pid, vpn, page)?;
                    pages.insert(vpn, page);
                    page
                }
            };
            let page_start = vpn.start_addr().0;
            let lo = page_start.max(start);
            let hi = (page_start + PAGE_SIZE).min(start + len_file);
            if lo < hi {
                mmu.write_page(page, lo - page_start, &data[lo - start..hi - start]);
            }
        }
    }

    let mut block = [0u8; AppArgs::SIZE];
    args.encode_into(&mut block);
    let arg_page = mmu.alloc()?;
    mmu.zero_page(arg_page);
    mmu.write_page(arg_page, 0, &block);
    mmu.map(pid, Vpn::from_addr_floor(Vaddr(APPS_ARG)), arg_page)?;

    let syscall_page = mmu.alloc()?;
    mmu.zero_page(syscall_page);
    mmu.map(pid, Vpn::from_addr_floor(Vaddr(SYSCALL_ARG)), syscall_page)?;

    let stack_top = Vpn::from_addr_floor(Vaddr(APPS_STACK_TOP));
    for i in 1..=APPS_STACK_PAGES {
        let page = mmu.alloc()?;
        mmu.zero_page(page);
        mmu.map(pid, Vpn(stack_top.0 - i), page)?;
    }

    log::debug!(
        "loader: pid {} entry {:#x}, {} code pages",
        pid,
        entry,
        pages.len()
    );
    Ok(entry)
}
