//! 陷入处理
//!
//! 入口第一件事是把陷入帧存进当前进程的 PCB，出口最后一件事是
//! 从（可能已经换过的）当前进程恢复陷入帧。中断只处理时钟，
//! 异常分为系统调用和进程错误两类。

use mm::address::Vaddr;
use uapi::{
    GPID_PROCESS, KernelCall, ProcRequest, SYSCALL_SIZE, Syscall, SyscallType,
    layout::SYSCALL_ARG,
};

use crate::Kernel;
use crate::config::{
    EXCP_ID_ECALL_M, EXCP_ID_ECALL_U, INTR_CODE_MASK, INTR_ID_TIMER, MCAUSE_INTERRUPT,
    SAVED_REGISTER_NUM,
};
use crate::hal::PrivMode;
use crate::process::ProcStatus;

/// mcause 解码结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapCause {
    /// 中断及其编号
    Interrupt(usize),
    /// 异常及其编号
    Exception(usize),
}

impl TrapCause {
    /// 按最高位区分中断和异常
    pub fn from_mcause(mcause: usize) -> Self {
        if mcause & MCAUSE_INTERRUPT != 0 {
            Self::Interrupt(mcause & INTR_CODE_MASK)
        } else {
            Self::Exception(mcause)
        }
    }
}

/// 陷入时保存的现场
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrapFrame {
    /// `regs[i]` 对应 `x{i}`，x0 不使用
    pub regs: [usize; SAVED_REGISTER_NUM],
    /// 陷入指令地址
    pub mepc: usize,
}

/// 陷入处理结束后核心的去向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapExit {
    /// 以 `mode` 特权级 mret 回到陷入帧中的进程
    Resume {
        /// mret 之后的特权级
        mode: PrivMode,
    },
    /// 没有可运行的进程：释放内核锁并等待下一次时钟中断
    Idle,
}

impl Kernel {
    /// 陷入总入口，调用者持有内核锁
    pub fn kernel_entry(&mut self, core: usize, mcause: usize, frame: &mut TrapFrame) -> TrapExit {
        if let Some(idx) = self.procs.current(core) {
            let p = self.procs.slot_mut(idx);
            p.saved = frame.regs;
            p.mepc = frame.mepc;
        }

        match TrapCause::from_mcause(mcause) {
            TrapCause::Interrupt(INTR_ID_TIMER) => {
                self.proc_yield(core);
            }
            TrapCause::Interrupt(code) => panic!("kernel_entry: got interrupt {}", code),
            TrapCause::Exception(code) => self.excp_entry(core, code),
        }

        match self.procs.current(core) {
            Some(idx) => {
                let p = self.procs.slot(idx);
                frame.regs = p.saved;
                frame.mepc = p.mepc;
                TrapExit::Resume {
                    mode: PrivMode::for_translation(self.mmu.kind()),
                }
            }
            None => TrapExit::Idle,
        }
    }

    fn excp_entry(&mut self, core: usize, code: usize) {
        // 运行中的进程可能已被别的核心释放
        let Some(idx) = self.procs.current(core) else {
            log::warn!("kernel_entry: exception {} from a freed process on core {}", code, core);
            self.proc_yield(core);
            return;
        };
        if (EXCP_ID_ECALL_U..=EXCP_ID_ECALL_M).contains(&code) {
            self.handle_syscall(idx, code);
        } else {
            self.handle_fault(idx, code);
        }
        self.proc_yield(core);
    }

    fn handle_syscall(&mut self, idx: usize, code: usize) {
        let pid = self.procs.slot(idx).pid;
        let mut block = [0u8; SYSCALL_SIZE];
        if let Err(err) = self.mmu.copy_from_user(pid, Vaddr(SYSCALL_ARG), &mut block) {
            panic!("handle_syscall: cannot read syscall of pid {}: {}", pid, err);
        }
        self.procs.slot_mut(idx).mepc += 4;

        let Ok(syscall) = Syscall::decode_request(&block) else {
            return self.handle_fault(idx, code);
        };
        match syscall.kind() {
            Ok(ty) if ty.is_ipc() => {
                let p = self.procs.slot_mut(idx);
                p.syscall = syscall;
                p.status = ProcStatus::PendingSyscall;
                self.try_syscall(idx);
            }
            _ => match KernelCall::from_syscall(&syscall) {
                Ok(call) if Self::may_call(pid, &call) => self.serve(idx, call, syscall),
                _ => self.handle_fault(idx, code),
            },
        }
    }

    /// 进程出错：代它向进程服务发送退出请求，此后它不会再被调度
    fn handle_fault(&mut self, idx: usize, code: usize) {
        let fault_addr = self.arch.fault_addr();
        let page_table = (self.arch.page_table_base() & 0xFFFFF) << 12;
        let p = self.procs.slot_mut(idx);
        log::error!(
            "process pid = {}: error code = {}, fault addr = {:#x}, mepc = {:#x}, page_table = {:#x}, exit with code -1",
            p.pid,
            code,
            fault_addr,
            p.mepc,
            page_table
        );

        let mut exit = Syscall {
            ty: SyscallType::Send as u32,
            receiver: GPID_PROCESS,
            ..Syscall::default()
        };
        exit.content[..ProcRequest::SIZE].copy_from_slice(&ProcRequest::exit().to_bytes());
        p.syscall = exit;
        p.exiting = true;
        p.status = ProcStatus::PendingSyscall;
        self.try_send(idx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_timer_interrupt() {
        assert_eq!(
            TrapCause::from_mcause(MCAUSE_INTERRUPT | 7),
            TrapCause::Interrupt(INTR_ID_TIMER)
        );
        assert_eq!(TrapCause::from_mcause(8), TrapCause::Exception(8));
    }

    #[test]
    fn test_interrupt_code_is_masked() {
        assert_eq!(
            TrapCause::from_mcause(MCAUSE_INTERRUPT | 0x1_0003),
            TrapCause::Interrupt(3)
        );
    }
}
