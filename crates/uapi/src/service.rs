//! 内核服务调用
//!
//! 进程管理服务需要的内核接口同样经由 [`crate::layout::SYSCALL_ARG`] 上的
//! 系统调用块发出，只是类型字段不是 send / recv。内核在陷入中立即完成这类
//! 调用，把 [`KernelReply`] 写回正文，再让出核心。
//!
//! 请求正文（小端）：
//!
//! ```text
//! 0     4      8      12
//! +-----+------+------+-------------------------+
//! | pid | arg1 | arg2 | AppArgs（仅 ProcLoad）  |
//! +-----+------+------+-------------------------+
//! ```
//!
//! 应答正文：`result` 之后是每个核心正在运行的进程号，只有
//! [`KernelCall::CoresInfo`] 填写，空闲核心为 [`GPID_UNUSED`]。

use crate::{
    read_u32, write_u32, AbiError, AppArgs, Pid, Syscall, SyscallType, GPID_UNUSED, NCORES,
};

const PID_OFFSET: usize = 0;
const ARG1_OFFSET: usize = 4;
const ARG2_OFFSET: usize = 8;
const ARGS_OFFSET: usize = 12;

/// 内核服务调用
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernelCall {
    /// 分配一个进程，结果为新进程号
    ProcAlloc,
    /// 回收进程，[`crate::GPID_ALL`] 表示全部用户进程
    ProcFree(Pid),
    /// 进程装载完毕，可以被调度
    ProcSetReady(Pid),
    /// 把调用者地址空间中 `[image, image + len)` 处的 ELF 镜像装入 `pid`
    ProcLoad {
        /// 目标进程
        pid: Pid,
        /// 镜像在调用者中的虚拟地址
        image: usize,
        /// 镜像长度
        len: usize,
        /// 写入目标进程参数页的启动参数
        args: AppArgs,
    },
    /// 让 `pid` 睡眠 `usec` 微秒
    Sleep {
        /// 目标进程
        pid: Pid,
        /// 微秒数
        usec: u32,
    },
    /// 查询各核心正在运行的进程
    CoresInfo,
}

impl KernelCall {
    /// 对应的系统调用类型
    pub fn ty(&self) -> SyscallType {
        match self {
            Self::ProcAlloc => SyscallType::ProcAlloc,
            Self::ProcFree(_) => SyscallType::ProcFree,
            Self::ProcSetReady(_) => SyscallType::ProcSetReady,
            Self::ProcLoad { .. } => SyscallType::ProcLoad,
            Self::Sleep { .. } => SyscallType::Sleep,
            Self::CoresInfo => SyscallType::CoresInfo,
        }
    }

    /// 被操作的进程，不针对某个进程时为 `None`
    pub fn target(&self) -> Option<Pid> {
        match *self {
            Self::ProcFree(pid) | Self::ProcSetReady(pid) => Some(pid),
            Self::ProcLoad { pid, .. } | Self::Sleep { pid, .. } => Some(pid),
            Self::ProcAlloc | Self::CoresInfo => None,
        }
    }

    /// 打包成系统调用块
    pub fn to_syscall(&self) -> Syscall {
        let mut sc = Syscall {
            ty: self.ty() as u32,
            ..Syscall::default()
        };
        let (arg1, arg2) = match self {
            Self::ProcLoad { image, len, .. } => (*image as u32, *len as u32),
            Self::Sleep { usec, .. } => (*usec, 0),
            _ => (0, 0),
        };
        let pid = self.target().unwrap_or(GPID_UNUSED);
        write_u32(&mut sc.content, PID_OFFSET, pid as u32);
        write_u32(&mut sc.content, ARG1_OFFSET, arg1);
        write_u32(&mut sc.content, ARG2_OFFSET, arg2);
        if let Self::ProcLoad { args, .. } = self {
            let mut block = [0u8; AppArgs::SIZE];
            args.encode_into(&mut block);
            sc.content[ARGS_OFFSET..ARGS_OFFSET + AppArgs::SIZE].copy_from_slice(&block);
        }
        sc
    }

    /// 从系统调用块解析，send / recv 返回 [`AbiError::NotKernelCall`]
    pub fn from_syscall(sc: &Syscall) -> Result<Self, AbiError> {
        let pid = read_u32(&sc.content, PID_OFFSET)? as Pid;
        let arg1 = read_u32(&sc.content, ARG1_OFFSET)?;
        let arg2 = read_u32(&sc.content, ARG2_OFFSET)?;
        match sc.kind()? {
            SyscallType::ProcAlloc => Ok(Self::ProcAlloc),
            SyscallType::ProcFree => Ok(Self::ProcFree(pid)),
            SyscallType::ProcSetReady => Ok(Self::ProcSetReady(pid)),
            SyscallType::ProcLoad => Ok(Self::ProcLoad {
                pid,
                image: arg1 as usize,
                len: arg2 as usize,
                args: AppArgs::decode(&sc.content[ARGS_OFFSET..])?,
            }),
            SyscallType::Sleep => Ok(Self::Sleep { pid, usec: arg1 }),
            SyscallType::CoresInfo => Ok(Self::CoresInfo),
            other => Err(AbiError::NotKernelCall(other as u32)),
        }
    }
}

/// 内核服务调用的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelReply {
    /// 非负表示成功；`ProcAlloc` 为新进程号，`CoresInfo` 为核心数
    pub result: i32,
    /// 各核心正在运行的进程号
    pub cores: [Pid; NCORES],
}

impl KernelReply {
    /// 失败时的 `result`
    pub const FAILED: i32 = -1;

    /// 只带结果值的应答
    pub const fn ok(result: i32) -> Self {
        Self {
            result,
            cores: [GPID_UNUSED; NCORES],
        }
    }

    /// 失败应答
    pub const fn failed() -> Self {
        Self::ok(Self::FAILED)
    }

    /// 是否成功
    pub const fn is_ok(&self) -> bool {
        self.result >= 0
    }

    /// 写入系统调用块的正文
    pub fn write_to(&self, sc: &mut Syscall) {
        write_u32(&mut sc.content, 0, self.result as u32);
        for (i, &pid) in self.cores.iter().enumerate() {
            write_u32(&mut sc.content, 4 + i * 4, pid as u32);
        }
    }

    /// 从完成的系统调用块读出
    pub fn read_from(sc: &Syscall) -> Result<Self, AbiError> {
        let mut cores = [GPID_UNUSED; NCORES];
        for (i, pid) in cores.iter_mut().enumerate() {
            *pid = read_u32(&sc.content, 4 + i * 4)? as Pid;
        }
        Ok(Self {
            result: read_u32(&sc.content, 0)? as i32,
            cores,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{proc::arg_bytes, GPID_ALL};

    #[test]
    fn test_load_request_layout() {
        let call = KernelCall::ProcLoad {
            pid: 6,
            image: 0x807F_C000,
            len: 4112,
            args: AppArgs::new(&["cat", "README"]).unwrap(),
        };
        let sc = call.to_syscall();
        assert_eq!(sc.ty, 6);
        assert_eq!(&sc.content[0..4], &6u32.to_le_bytes());
        assert_eq!(&sc.content[4..8], &0x807F_C000u32.to_le_bytes());
        assert_eq!(&sc.content[8..12], &4112u32.to_le_bytes());
        assert_eq!(&sc.content[12..16], &2u32.to_le_bytes());

        let KernelCall::ProcLoad { args, .. } = KernelCall::from_syscall(&sc).unwrap() else {
            panic!("not a load request");
        };
        assert_eq!(arg_bytes(&args.argv, 1), Some(&b"README"[..]));
    }

    #[test]
    fn test_free_all_keeps_wildcard() {
        let sc = KernelCall::ProcFree(GPID_ALL).to_syscall();
        assert_eq!(KernelCall::from_syscall(&sc), Ok(KernelCall::ProcFree(GPID_ALL)));
    }

    #[test]
    fn test_ipc_is_not_a_kernel_call() {
        assert_eq!(
            KernelCall::from_syscall(&Syscall::recv(GPID_ALL)),
            Err(AbiError::NotKernelCall(SyscallType::Recv as u32))
        );
    }

    #[test]
    fn test_reply_carries_cores() {
        let mut sc = Syscall::default();
        let reply = KernelReply {
            result: NCORES as i32,
            cores: [1, GPID_UNUSED, 7, GPID_UNUSED],
        };
        reply.write_to(&mut sc);
        assert_eq!(KernelReply::read_from(&sc), Ok(reply));
        assert!(!KernelReply::failed().is_ok());
    }
}
