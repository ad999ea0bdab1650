//! grass 启动：装入进程管理服务并交出核心

use core::fmt;

use uapi::layout::{APPS_ARG, APPS_ENTRY};
use uapi::{AppArgs, GPID_PROCESS, Pid};

use crate::Kernel;
use crate::config::SYS_PROC_EXEC_START;
use crate::hal::{BlockDevice, PrivMode};
use crate::loader::{self, LoadError};
use crate::process::{ProcError, ProcStatus};

/// 启动失败
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootError {
    /// 无法分配 PCB
    Proc(ProcError),
    /// 装载失败
    Load(LoadError),
}

impl From<ProcError> for BootError {
    fn from(err: ProcError) -> Self {
        Self::Proc(err)
    }
}

impl From<LoadError> for BootError {
    fn from(err: LoadError) -> Self {
        Self::Load(err)
    }
}

impl fmt::Display for BootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Proc(err) => write!(f, "{}", err),
            Self::Load(err) => write!(f, "{}", err),
        }
    }
}

/// 第一个进程的入口现场
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootEntry {
    /// 进程号，总是 [`GPID_PROCESS`]
    pub pid: Pid,
    /// mepc
    pub entry: usize,
    /// a0
    pub arg: usize,
    /// mret 之后的特权级
    pub mode: PrivMode,
}

impl Kernel {
    /// 把 ELF 镜像装入已分配的进程 `pid`
    pub fn proc_load(&mut self, pid: Pid, image: &[u8], args: &AppArgs) -> Result<(), LoadError> {
        let entry = loader::load_elf(&mut self.mmu, pid, image, args)?;
        if entry != APPS_ENTRY {
            log::warn!("pid {}: elf entry {:#x} ignored, start at {:#x}", pid, entry, APPS_ENTRY);
        }
        Ok(())
    }

    /// 装入进程管理服务，让它在核心 `core` 上运行
    ///
    /// 其余核心保持空闲，等待时钟中断。返回值描述了 mret 前需要设置的现场。
    pub fn grass_entry(
        &mut self,
        core: usize,
        disk: &mut dyn BlockDevice,
    ) -> Result<BootEntry, BootError> {
        log::info!("Enter the grass layer");
        log::info!("Load kernel process #{}: sys_process", GPID_PROCESS);

        let pid = self.proc_alloc()?;
        debug_assert_eq!(pid, GPID_PROCESS);
        let image = loader::read_image(disk, SYS_PROC_EXEC_START);
        self.proc_load(pid, &image, &AppArgs::default())?;

        let now = self.now();
        let idx = self.procs.index_of(pid).ok_or(ProcError::NoSuchProcess(pid))?;
        let p = self.procs.slot_mut(idx);
        p.status = ProcStatus::Running;
        p.response_time = Some(now.saturating_sub(p.create_time));
        p.last_scheduled = Some(now);
        p.schedule_count = 1;
        p.mepc = APPS_ENTRY;
        self.procs.set_current(core, Some(idx));

        self.mmu.switch(pid).map_err(LoadError::from)?;
        self.mmu.flush_cache();

        Ok(BootEntry {
            pid,
            entry: APPS_ENTRY,
            arg: APPS_ARG,
            mode: PrivMode::Machine,
        })
    }
}
