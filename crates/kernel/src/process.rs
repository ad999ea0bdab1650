//! 进程表
//!
//! 固定 [`MAX_NPROCESS`] 个槽位，以 [`ProcStatus::Unused`] 标记空闲。
//! 进程号单调递增，从不复用。所有状态修改都经过 [`ProcessTable`]，
//! 且只作用于存活的槽位。

use core::fmt;

use uapi::{GPID_ALL, GPID_USER_START, Pid, Syscall};

use crate::Kernel;
use crate::config::{MAX_NPROCESS, NCORES, SAVED_REGISTER_NUM};

/// 进程状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcStatus {
    /// 空闲槽位
    Unused,
    /// 已分配，等待装载
    Loading,
    /// 已装载，等待第一次运行
    Ready,
    /// 正在某个核心上运行
    Running,
    /// 可运行
    Runnable,
    /// 等待系统调用完成
    PendingSyscall,
    /// 睡眠到 `wake_time`
    SleepSyscall,
}

impl fmt::Display for ProcStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unused => "PROC_UNUSED",
            Self::Loading => "PROC_LOADING",
            Self::Ready => "PROC_READY",
            Self::Running => "PROC_RUNNING",
            Self::Runnable => "PROC_RUNNABLE",
            Self::PendingSyscall => "PROC_PENDING_SYSCALL",
            Self::SleepSyscall => "PROC_SLEEP_SYSCALL",
        };
        f.write_str(name)
    }
}

/// 进程控制块
#[derive(Debug, Clone)]
pub struct Process {
    /// 进程号
    pub pid: Pid,
    /// 状态
    pub status: ProcStatus,
    /// 进行中的系统调用
    pub syscall: Syscall,
    /// 返回地址
    pub mepc: usize,
    /// 保存的通用寄存器，`saved[i]` 对应 `x{i}`
    pub saved: [usize; SAVED_REGISTER_NUM],
    /// 因异常而退出：会合 IPC 不再唤醒它
    pub exiting: bool,
    /// 创建时刻
    pub create_time: u64,
    /// 从创建到第一次被调度的时长
    pub response_time: Option<u64>,
    /// 累计占用的 CPU 时间
    pub cpu_time: u64,
    /// 最近一次被调度上核的时刻，不在核上时为 `None`
    pub last_scheduled: Option<u64>,
    /// 被调度次数
    pub schedule_count: u32,
    /// 睡眠截止时刻
    pub wake_time: u64,
}

impl Process {
    const fn empty() -> Self {
        Self {
            pid: 0,
            status: ProcStatus::Unused,
            syscall: Syscall {
                ty: 0,
                status: uapi::SyscallStatus::Pending,
                sender: 0,
                receiver: 0,
                content: [0; uapi::SYSCALL_MSG_LEN],
            },
            mepc: 0,
            saved: [0; SAVED_REGISTER_NUM],
            exiting: false,
            create_time: 0,
            response_time: None,
            cpu_time: 0,
            last_scheduled: None,
            schedule_count: 0,
            wake_time: 0,
        }
    }

    /// 槽位是否被占用
    pub fn is_live(&self) -> bool {
        self.status != ProcStatus::Unused
    }
}

/// 进程管理错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcError {
    /// 进程表已满
    ResourceExhausted,
    /// 没有该进程
    NoSuchProcess(Pid),
}

impl fmt::Display for ProcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResourceExhausted => {
                write!(f, "reach the limit of {} processes", MAX_NPROCESS)
            }
            Self::NoSuchProcess(pid) => write!(f, "no process with pid {}", pid),
        }
    }
}

/// 进程表
pub struct ProcessTable {
    slots: [Process; MAX_NPROCESS],
    last_pid: Pid,
    // 每个核心正在运行的槽位，None 表示空闲
    on_core: [Option<usize>; NCORES],
}

impl ProcessTable {
    /// 空表，所有核心空闲
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| Process::empty()),
            last_pid: 0,
            on_core: [None; NCORES],
        }
    }

    /// 分配一个槽位，进入 [`ProcStatus::Loading`]
    pub fn alloc(&mut self, now: u64) -> Result<Pid, ProcError> {
        let slot = self
            .slots
            .iter_mut()
            .find(|p| !p.is_live())
            .ok_or(ProcError::ResourceExhausted)?;
        self.last_pid += 1;
        *slot = Process {
            pid: self.last_pid,
            status: ProcStatus::Loading,
            create_time: now,
            ..Process::empty()
        };
        Ok(self.last_pid)
    }

    /// 存活进程 `pid` 所在的槽位
    pub fn index_of(&self, pid: Pid) -> Option<usize> {
        self.slots.iter().position(|p| p.is_live() && p.pid == pid)
    }

    /// 存活进程
    pub fn get(&self, pid: Pid) -> Option<&Process> {
        self.index_of(pid).map(|idx| &self.slots[idx])
    }

    /// 存活进程（可变）
    pub fn get_mut(&mut self, pid: Pid) -> Option<&mut Process> {
        self.index_of(pid).map(move |idx| &mut self.slots[idx])
    }

    /// 按槽位访问
    pub fn slot(&self, idx: usize) -> &Process {
        &self.slots[idx]
    }

    /// 按槽位访问（可变）
    pub fn slot_mut(&mut self, idx: usize) -> &mut Process {
        &mut self.slots[idx]
    }

    /// 修改存活进程的状态，`pid` 不存在时返回 `false`
    pub fn set_status(&mut self, pid: Pid, status: ProcStatus) -> bool {
        match self.get_mut(pid) {
            Some(p) => {
                p.status = status;
                true
            }
            None => false,
        }
    }

    /// 释放槽位，同时让正在运行它的核心变为空闲
    pub fn release(&mut self, idx: usize) {
        self.slots[idx].status = ProcStatus::Unused;
        for slot in self.on_core.iter_mut().filter(|s| **s == Some(idx)) {
            *slot = None;
        }
    }

    /// 存活进程
    pub fn live(&self) -> impl Iterator<Item = &Process> {
        self.slots.iter().filter(|p| p.is_live())
    }

    /// 核心 `core` 正在运行的槽位
    pub fn current(&self, core: usize) -> Option<usize> {
        self.on_core.get(core).copied().flatten()
    }

    /// 设置核心 `core` 正在运行的槽位
    pub fn set_current(&mut self, core: usize, idx: Option<usize>) {
        self.on_core[core] = idx;
    }
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

/// 以秒为单位、保留两位小数显示 mtime 计数（1 MHz）
struct Seconds(u64);

impl fmt::Display for Seconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 1_000_000, self.0 / 10_000 % 100)
    }
}

// ============================================================================
// 向上暴露的进程管理接口
// ============================================================================

impl Kernel {
    /// 分配一个新进程，返回其进程号
    pub fn proc_alloc(&mut self) -> Result<Pid, ProcError> {
        let now = self.now();
        let pid = self.procs.alloc(now)?;
        log::debug!("proc_alloc: pid {} at {}", pid, now);
        Ok(pid)
    }

    /// 释放进程及其全部物理页；[`GPID_ALL`] 释放全部用户进程
    pub fn proc_free(&mut self, pid: Pid) -> Result<(), ProcError> {
        if pid == GPID_ALL {
            for idx in 0..MAX_NPROCESS {
                let p = self.procs.slot(idx);
                if p.is_live() && p.pid >= GPID_USER_START {
                    let victim = p.pid;
                    self.mmu.free(victim);
                    self.procs.release(idx);
                }
            }
            return Ok(());
        }

        let idx = self.procs.index_of(pid).ok_or(ProcError::NoSuchProcess(pid))?;
        self.report_metrics(idx);
        self.mmu.free(pid);
        self.procs.release(idx);
        Ok(())
    }

    fn report_metrics(&self, idx: usize) {
        let p = self.procs.slot(idx);
        let now = self.now();
        let turnaround = now.saturating_sub(p.create_time);
        let cpu = p.cpu_time + p.last_scheduled.map_or(0, |t| now.saturating_sub(t));
        log::info!(
            "proc {} died after {} yields, turnaround time: {}, response time: {}, cpu time: {}",
            p.pid,
            p.schedule_count,
            Seconds(turnaround),
            Seconds(p.response_time.unwrap_or(0)),
            Seconds(cpu),
        );
    }

    /// 装载完成，等待第一次运行
    pub fn proc_set_ready(&mut self, pid: Pid) -> Result<(), ProcError> {
        if self.procs.set_status(pid, ProcStatus::Ready) {
            Ok(())
        } else {
            Err(ProcError::NoSuchProcess(pid))
        }
    }

    /// 让 `pid` 睡眠 `usec` 微秒
    pub fn proc_sleep(&mut self, pid: Pid, usec: u32) -> Result<(), ProcError> {
        let now = self.now();
        let p = self.procs.get_mut(pid).ok_or(ProcError::NoSuchProcess(pid))?;
        p.wake_time = now + usec as u64;
        p.status = ProcStatus::SleepSyscall;
        log::debug!("proc_sleep: pid {} until {}", pid, p.wake_time);
        Ok(())
    }

    /// 每个核心正在运行的进程号
    pub fn cores_info(&self) -> [Option<Pid>; NCORES] {
        let mut info = [None; NCORES];
        for (core, pid) in info.iter_mut().enumerate() {
            *pid = self.procs.current(core).map(|idx| self.procs.slot(idx).pid);
            match pid {
                Some(pid) => log::info!("core {}: pid {}", core, pid),
                None => log::info!("core {}: idle", core),
            }
        }
        info
    }
}
