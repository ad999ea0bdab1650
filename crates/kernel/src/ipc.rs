//! 同步会合 IPC
//!
//! 没有消息队列：未能配对的请求保持 [`ProcStatus::PendingSyscall`]，
//! 由调度器每次扫描时重试。

use mm::address::Vaddr;
use uapi::{GPID_ALL, SyscallStatus, SyscallType, layout::SYSCALL_ARG};

use crate::Kernel;
use crate::process::ProcStatus;

impl Kernel {
    /// 尝试推进槽位 `idx` 上的系统调用
    pub(crate) fn try_syscall(&mut self, idx: usize) {
        let proc = self.procs.slot(idx);
        match proc.syscall.kind() {
            Ok(SyscallType::Send) => self.try_send(idx),
            Ok(SyscallType::Recv) => self.try_recv(idx),
            _ => panic!(
                "try_syscall: pid {} has unknown syscall type {}",
                proc.pid, proc.syscall.ty
            ),
        }
    }

    /// 若接收者正在等待本进程的消息，把正文交给它
    pub(crate) fn try_send(&mut self, idx: usize) {
        let sender = self.procs.slot(idx);
        if sender.syscall.status == SyscallStatus::Done {
            return;
        }
        let pid = sender.pid;
        let receiver = sender.syscall.receiver;
        let Some(dst_idx) = self.procs.index_of(receiver) else {
            panic!("try_send: pid {} sends to unknown receiver {}", pid, receiver);
        };

        let dst = &self.procs.slot(dst_idx).syscall;
        let waiting = dst.kind() == Ok(SyscallType::Recv) && dst.status == SyscallStatus::Pending;
        if !waiting || !(dst.sender == GPID_ALL || dst.sender == pid) {
            return;
        }

        let content = self.procs.slot(idx).syscall.content;
        let dst = &mut self.procs.slot_mut(dst_idx).syscall;
        dst.status = SyscallStatus::Done;
        dst.sender = pid;
        dst.content = content;
        self.procs.slot_mut(idx).syscall.status = SyscallStatus::Done;
        log::trace!("ipc: {} -> {} delivered", pid, receiver);
    }

    /// 消息到达后拷回用户空间，同时释放接收者和发送者
    pub(crate) fn try_recv(&mut self, idx: usize) {
        let proc = self.procs.slot(idx);
        if proc.syscall.status == SyscallStatus::Pending {
            return;
        }
        let pid = proc.pid;
        let sender = proc.syscall.sender;
        let block = proc.syscall.to_bytes();
        if let Err(err) = self.mmu.copy_to_user(pid, Vaddr(SYSCALL_ARG), &block) {
            panic!("try_recv: cannot write back syscall of pid {}: {}", pid, err);
        }

        self.procs.slot_mut(idx).status = ProcStatus::Runnable;
        if let Some(src) = self.procs.get_mut(sender) {
            if !src.exiting {
                src.status = ProcStatus::Runnable;
            }
        }
    }
}
