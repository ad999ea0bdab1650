//! 内核服务调用
//!
//! 进程管理服务经 ecall 发出 [`KernelCall`]，内核在陷入中就地完成，
//! 把 [`KernelReply`] 写回调用者的系统调用页。除了让自己睡眠之外，
//! 只有系统进程可以发出这类调用。

use alloc::vec;
use core::fmt;

use mm::address::Vaddr;
use uapi::layout::SYSCALL_ARG;
use uapi::{
    GPID_UNUSED, KernelCall, KernelReply, NCORES, Pid, Syscall, SyscallStatus, is_system_pid,
};

use crate::Kernel;
use crate::config::SYS_EXEC_SIZE;
use crate::loader::LoadError;
use crate::process::ProcError;

/// 服务调用失败
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceError {
    /// 进程表操作失败
    Proc(ProcError),
    /// 装载失败
    Load(LoadError),
    /// 镜像超过一个系统程序的大小
    ImageTooLarge(usize),
}

impl From<ProcError> for ServiceError {
    fn from(err: ProcError) -> Self {
        Self::Proc(err)
    }
}

impl From<LoadError> for ServiceError {
    fn from(err: LoadError) -> Self {
        Self::Load(err)
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Proc(err) => write!(f, "{}", err),
            Self::Load(err) => write!(f, "{}", err),
            Self::ImageTooLarge(len) => {
                write!(f, "image of {} bytes exceeds {} bytes", len, SYS_EXEC_SIZE)
            }
        }
    }
}

impl Kernel {
    /// `caller` 是否有权发出 `call`
    pub(crate) fn may_call(caller: Pid, call: &KernelCall) -> bool {
        match call {
            KernelCall::Sleep { pid, .. } => *pid == caller || is_system_pid(caller),
            _ => is_system_pid(caller),
        }
    }

    /// 完成槽位 `idx` 发出的服务调用并写回应答
    pub(crate) fn serve(&mut self, idx: usize, call: KernelCall, mut syscall: Syscall) {
        let caller = self.procs.slot(idx).pid;
        let reply = match self.dispatch(caller, &call) {
            Ok(reply) => reply,
            Err(err) => {
                log::warn!("pid {}: {:?} failed: {}", caller, call.ty(), err);
                KernelReply::failed()
            }
        };

        // 调用者可能刚刚释放了自己
        let Some(idx) = self.procs.index_of(caller).filter(|&i| i == idx) else {
            return;
        };
        syscall.status = SyscallStatus::Done;
        reply.write_to(&mut syscall);
        if let Err(err) = self.mmu.copy_to_user(caller, Vaddr(SYSCALL_ARG), &syscall.to_bytes()) {
            panic!("serve: cannot write back syscall of pid {}: {}", caller, err);
        }
        self.procs.slot_mut(idx).syscall = syscall;
    }

    fn dispatch(&mut self, caller: Pid, call: &KernelCall) -> Result<KernelReply, ServiceError> {
        match *call {
            KernelCall::ProcAlloc => Ok(KernelReply::ok(self.proc_alloc()?)),
            KernelCall::ProcFree(pid) => {
                self.proc_free(pid)?;
                Ok(KernelReply::ok(0))
            }
            KernelCall::ProcSetReady(pid) => {
                self.proc_set_ready(pid)?;
                Ok(KernelReply::ok(0))
            }
            KernelCall::ProcLoad {
                pid,
                image,
                len,
                ref args,
            } => {
                if len > SYS_EXEC_SIZE {
                    return Err(ServiceError::ImageTooLarge(len));
                }
                if self.procs.index_of(pid).is_none() {
                    return Err(ProcError::NoSuchProcess(pid).into());
                }
                let mut buf = vec![0u8; len];
                self.mmu
                    .copy_from_user(caller, Vaddr(image), &mut buf)
                    .map_err(LoadError::from)?;
                self.proc_load(pid, &buf, args)?;
                Ok(KernelReply::ok(0))
            }
            KernelCall::Sleep { pid, usec } => {
                self.proc_sleep(pid, usec)?;
                Ok(KernelReply::ok(0))
            }
            KernelCall::CoresInfo => Ok(KernelReply {
                result: NCORES as i32,
                cores: self.cores_info().map(|pid| pid.unwrap_or(GPID_UNUSED)),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uapi::{GPID_ALL, GPID_PROCESS, GPID_USER_START};

    #[test]
    fn test_user_may_only_sleep_itself() {
        let user = GPID_USER_START + 2;
        let sleep = |pid| KernelCall::Sleep { pid, usec: 10 };
        assert!(Kernel::may_call(user, &sleep(user)));
        assert!(!Kernel::may_call(user, &sleep(GPID_PROCESS)));
        assert!(!Kernel::may_call(user, &KernelCall::ProcFree(GPID_ALL)));
        assert!(!Kernel::may_call(user, &KernelCall::CoresInfo));
    }

    #[test]
    fn test_system_process_may_call_anything() {
        assert!(Kernel::may_call(GPID_PROCESS, &KernelCall::ProcAlloc));
        assert!(Kernel::may_call(
            GPID_PROCESS,
            &KernelCall::Sleep {
                pid: GPID_USER_START,
                usec: 1
            }
        ));
    }
}
