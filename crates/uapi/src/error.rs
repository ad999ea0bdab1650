//! ABI 编解码错误

use core::fmt;

/// 编码或解码 ABI 结构体时可能出现的错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbiError {
    /// 系统调用类型字段不是已知值
    BadSyscallType(u32),
    /// 系统调用状态字段不是已知值
    BadSyscallStatus(u32),
    /// 进程管理请求类型不是已知值
    BadRequestType(u32),
    /// 应答类型不是已知值
    BadReplyType(u32),
    /// send / recv 不是内核服务调用
    NotKernelCall(u32),
    /// 输入字节不足以容纳整个结构体
    Truncated,
    /// 消息超过 [`crate::SYSCALL_MSG_LEN`]
    MessageTooLong(usize),
    /// 参数个数超过 [`crate::CMD_NARGS`]
    TooManyArgs(usize),
    /// 单个参数（含结尾 NUL）超过 [`crate::CMD_ARG_LEN`]
    ArgTooLong(usize),
}

impl fmt::Display for AbiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadSyscallType(t) => write!(f, "unknown syscall type {}", t),
            Self::BadSyscallStatus(s) => write!(f, "unknown syscall status {}", s),
            Self::BadRequestType(t) => write!(f, "unknown process request type {}", t),
            Self::BadReplyType(t) => write!(f, "unknown process reply type {}", t),
            Self::NotKernelCall(t) => write!(f, "syscall type {} is not a kernel call", t),
            Self::Truncated => write!(f, "truncated ABI record"),
            Self::MessageTooLong(len) => write!(f, "message of {} bytes is too long", len),
            Self::TooManyArgs(n) => write!(f, "{} arguments exceed the limit", n),
            Self::ArgTooLong(len) => write!(f, "argument of {} bytes is too long", len),
        }
    }
}
