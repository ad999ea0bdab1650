//! 轮转调度

use uapi::layout::{APPS_ARG, APPS_ENTRY};

use crate::Kernel;
use crate::config::MAX_NPROCESS;
use crate::process::ProcStatus;
use crate::timer::Timer;

/// a0 / a1 在保存区中的下标
const REG_A0: usize = 10;
const REG_A1: usize = 11;

/// 一次调度的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// 核心 `core` 上将运行该槽位
    Run(usize),
    /// 没有可运行的进程，核心进入空闲
    Idle,
}

impl Kernel {
    /// 放弃核心 `core` 上的当前进程，选出下一个
    ///
    /// 从当前槽位之后扫描一整圈：挂起的系统调用各重试一次，到期的睡眠进程
    /// 转为可运行，第一个 Ready / Runnable 的进程被选中。
    pub fn proc_yield(&mut self, core: usize) -> Schedule {
        let now = self.now();
        let prev = self.procs.current(core);

        if let Some(idx) = prev {
            let p = self.procs.slot_mut(idx);
            if p.status == ProcStatus::Running {
                p.status = ProcStatus::Runnable;
            }
            if let Some(since) = p.last_scheduled.take() {
                p.cpu_time += now.saturating_sub(since);
            }
        }

        let start = prev.unwrap_or(MAX_NPROCESS - 1);
        let mut next = None;
        for i in 1..=MAX_NPROCESS {
            let idx = (start + i) % MAX_NPROCESS;
            match self.procs.slot(idx).status {
                ProcStatus::PendingSyscall => self.try_syscall(idx),
                ProcStatus::SleepSyscall if now >= self.procs.slot(idx).wake_time => {
                    self.procs.slot_mut(idx).status = ProcStatus::Runnable;
                }
                _ => {}
            }
            if matches!(
                self.procs.slot(idx).status,
                ProcStatus::Ready | ProcStatus::Runnable
            ) {
                next = Some(idx);
                break;
            }
        }

        self.timer.reset(&*self.arch, core);
        self.procs.set_current(core, next);

        let Some(idx) = next else {
            self.idle(core);
            return Schedule::Idle;
        };

        let kind = self.mmu.kind();
        let p = self.procs.slot_mut(idx);
        if prev != Some(idx) {
            p.schedule_count += 1;
        }
        if p.response_time.is_none() {
            p.response_time = Some(now.saturating_sub(p.create_time));
        }
        p.last_scheduled = Some(now);
        if p.status == ProcStatus::Ready {
            p.saved[REG_A0] = APPS_ARG;
            p.saved[REG_A1] = APPS_ARG + 4;
            p.mepc = APPS_ENTRY;
        }
        p.status = ProcStatus::Running;
        let pid = p.pid;

        if let Err(err) = self.mmu.switch(pid) {
            panic!("proc_yield: cannot switch to pid {} ({}): {}", pid, kind, err);
        }
        self.mmu.flush_cache();
        Schedule::Run(idx)
    }

    fn idle(&self, core: usize) {
        if self.procs.live().next().is_none() {
            panic!("proc_yield: no process left to run on core {}", core);
        }
        log::debug!("core {} goes idle at {}", core, Timer::mtime(&*self.arch));
        for p in self.procs.live() {
            log::debug!("pid = {}, status = {}", p.pid, p.status);
        }
    }
}
