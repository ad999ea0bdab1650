//! 系统调用块
//!
//! 用户程序把 [`Syscall`] 写到 [`crate::layout::SYSCALL_ARG`] 后执行 `ecall`，
//! 内核经地址翻译后按物理地址拷入 PCB，完成时再拷回原处。
//!
//! 线上布局（小端）：
//!
//! ```text
//! 0      4        8        12         16
//! +------+--------+--------+----------+---------------------+
//! | type | status | sender | receiver | content[1024]       |
//! +------+--------+--------+----------+---------------------+
//! ```

use crate::{read_u32, write_u32, AbiError, Pid};

/// 单条消息正文的最大长度
pub const SYSCALL_MSG_LEN: usize = 1024;
/// 编码后的系统调用块长度
pub const SYSCALL_SIZE: usize = 16 + SYSCALL_MSG_LEN;

const TYPE_OFFSET: usize = 0;
const STATUS_OFFSET: usize = 4;
const SENDER_OFFSET: usize = 8;
const RECEIVER_OFFSET: usize = 12;
const CONTENT_OFFSET: usize = 16;

/// 系统调用类型
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallType {
    /// 尚未使用的系统调用块
    Unused = 0,
    /// 接收
    Recv = 1,
    /// 发送
    Send = 2,
    /// 分配进程，见 [`crate::KernelCall`]
    ProcAlloc = 3,
    /// 回收进程
    ProcFree = 4,
    /// 进程装载完毕
    ProcSetReady = 5,
    /// 从调用者内存装载 ELF 镜像
    ProcLoad = 6,
    /// 睡眠
    Sleep = 7,
    /// 查询各核心正在运行的进程
    CoresInfo = 8,
}

impl SyscallType {
    /// send / recv 走会合 IPC，其余类型由内核立即完成
    pub const fn is_ipc(self) -> bool {
        matches!(self, Self::Send | Self::Recv)
    }
}

impl TryFrom<u32> for SyscallType {
    type Error = AbiError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Unused),
            1 => Ok(Self::Recv),
            2 => Ok(Self::Send),
            3 => Ok(Self::ProcAlloc),
            4 => Ok(Self::ProcFree),
            5 => Ok(Self::ProcSetReady),
            6 => Ok(Self::ProcLoad),
            7 => Ok(Self::Sleep),
            8 => Ok(Self::CoresInfo),
            other => Err(AbiError::BadSyscallType(other)),
        }
    }
}

/// 系统调用状态
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallStatus {
    /// 等待完成
    Pending = 0,
    /// 已完成
    Done = 1,
}

impl TryFrom<u32> for SyscallStatus {
    type Error = AbiError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Pending),
            1 => Ok(Self::Done),
            other => Err(AbiError::BadSyscallStatus(other)),
        }
    }
}

/// 系统调用块
///
/// `ty` 保留原始的 u32 而不是 [`SyscallType`]：用户可以写入任意值，
/// 内核需要在拷入之后自行判断是否合法。
#[derive(Clone, PartialEq, Eq)]
pub struct Syscall {
    /// 类型的原始编码，见 [`Syscall::kind`]
    pub ty: u32,
    /// 完成状态
    pub status: SyscallStatus,
    /// send 时由内核填写真实发送者；recv 时为过滤条件（[`crate::GPID_ALL`] 表示任意）
    pub sender: Pid,
    /// send 的目标进程
    pub receiver: Pid,
    /// 消息正文
    pub content: [u8; SYSCALL_MSG_LEN],
}

impl Default for Syscall {
    fn default() -> Self {
        Self {
            ty: SyscallType::Unused as u32,
            status: SyscallStatus::Pending,
            sender: 0,
            receiver: 0,
            content: [0; SYSCALL_MSG_LEN],
        }
    }
}

impl core::fmt::Debug for Syscall {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Syscall")
            .field("ty", &self.ty)
            .field("status", &self.status)
            .field("sender", &self.sender)
            .field("receiver", &self.receiver)
            .finish_non_exhaustive()
    }
}

impl Syscall {
    /// 构造一个发往 `receiver` 的 send 请求
    pub fn send(receiver: Pid, msg: &[u8]) -> Result<Self, AbiError> {
        let mut sc = Self {
            ty: SyscallType::Send as u32,
            receiver,
            ..Self::default()
        };
        sc.set_content(msg)?;
        Ok(sc)
    }

    /// 构造一个 recv 请求，`from` 为 [`crate::GPID_ALL`] 时接受任意发送者
    pub fn recv(from: Pid) -> Self {
        Self {
            ty: SyscallType::Recv as u32,
            sender: from,
            ..Self::default()
        }
    }

    /// 解析类型字段
    pub fn kind(&self) -> Result<SyscallType, AbiError> {
        SyscallType::try_from(self.ty)
    }

    /// 覆盖正文，剩余部分清零
    pub fn set_content(&mut self, msg: &[u8]) -> Result<(), AbiError> {
        if msg.len() > SYSCALL_MSG_LEN {
            return Err(AbiError::MessageTooLong(msg.len()));
        }
        self.content[..msg.len()].copy_from_slice(msg);
        self.content[msg.len()..].fill(0);
        Ok(())
    }

    /// 编码到定长缓冲区
    pub fn encode_into(&self, out: &mut [u8; SYSCALL_SIZE]) {
        write_u32(out, TYPE_OFFSET, self.ty);
        write_u32(out, STATUS_OFFSET, self.status as u32);
        write_u32(out, SENDER_OFFSET, self.sender as u32);
        write_u32(out, RECEIVER_OFFSET, self.receiver as u32);
        out[CONTENT_OFFSET..].copy_from_slice(&self.content);
    }

    /// 编码到 `out`，`out` 至少 [`SYSCALL_SIZE`] 字节
    pub fn encode(&self, out: &mut [u8]) -> Result<(), AbiError> {
        let out = out
            .first_chunk_mut::<SYSCALL_SIZE>()
            .ok_or(AbiError::Truncated)?;
        self.encode_into(out);
        Ok(())
    }

    /// 编码为定长数组
    pub fn to_bytes(&self) -> [u8; SYSCALL_SIZE] {
        let mut out = [0u8; SYSCALL_SIZE];
        self.encode_into(&mut out);
        out
    }

    /// 从字节解码
    ///
    /// 类型字段不做检查（见 [`Syscall::ty`]），状态字段必须合法。
    pub fn decode(bytes: &[u8]) -> Result<Self, AbiError> {
        if bytes.len() < SYSCALL_SIZE {
            return Err(AbiError::Truncated);
        }
        let mut content = [0u8; SYSCALL_MSG_LEN];
        content.copy_from_slice(&bytes[CONTENT_OFFSET..SYSCALL_SIZE]);
        Ok(Self {
            ty: read_u32(bytes, TYPE_OFFSET)?,
            status: SyscallStatus::try_from(read_u32(bytes, STATUS_OFFSET)?)?,
            sender: read_u32(bytes, SENDER_OFFSET)? as Pid,
            receiver: read_u32(bytes, RECEIVER_OFFSET)? as Pid,
            content,
        })
    }

    /// 按用户提交的请求解码：忽略状态字段，一律视为 [`SyscallStatus::Pending`]
    pub fn decode_request(bytes: &[u8]) -> Result<Self, AbiError> {
        if bytes.len() < SYSCALL_SIZE {
            return Err(AbiError::Truncated);
        }
        let mut content = [0u8; SYSCALL_MSG_LEN];
        content.copy_from_slice(&bytes[CONTENT_OFFSET..SYSCALL_SIZE]);
        Ok(Self {
            ty: read_u32(bytes, TYPE_OFFSET)?,
            status: SyscallStatus::Pending,
            sender: read_u32(bytes, SENDER_OFFSET)? as Pid,
            receiver: read_u32(bytes, RECEIVER_OFFSET)? as Pid,
            content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GPID_ALL;

    #[test]
    fn test_layout_offsets() {
        let mut sc = Syscall::send(3, b"hi").unwrap();
        sc.sender = 7;
        let bytes = sc.to_bytes();
        assert_eq!(&bytes[0..4], &2u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &0u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &7u32.to_le_bytes());
        assert_eq!(&bytes[12..16], &3u32.to_le_bytes());
        assert_eq!(&bytes[16..18], b"hi");
        assert!(bytes[18..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_recv_wildcard_sender() {
        let sc = Syscall::recv(GPID_ALL);
        let back = Syscall::decode(&sc.to_bytes()).unwrap();
        assert_eq!(back.sender, GPID_ALL);
        assert_eq!(back.kind(), Ok(SyscallType::Recv));
    }

    #[test]
    fn test_message_too_long() {
        let msg = [0u8; SYSCALL_MSG_LEN + 1];
        assert_eq!(
            Syscall::send(1, &msg).unwrap_err(),
            AbiError::MessageTooLong(SYSCALL_MSG_LEN + 1)
        );
    }

    #[test]
    fn test_unknown_type_survives_decode() {
        let mut bytes = Syscall::recv(1).to_bytes();
        bytes[0..4].copy_from_slice(&9u32.to_le_bytes());
        let sc = Syscall::decode(&bytes).unwrap();
        assert_eq!(sc.kind(), Err(AbiError::BadSyscallType(9)));
    }

    #[test]
    fn test_bad_status_rejected() {
        let mut bytes = Syscall::recv(1).to_bytes();
        bytes[4..8].copy_from_slice(&5u32.to_le_bytes());
        assert_eq!(
            Syscall::decode(&bytes).unwrap_err(),
            AbiError::BadSyscallStatus(5)
        );
    }

    #[test]
    fn test_request_ignores_user_status() {
        let mut bytes = Syscall::recv(1).to_bytes();
        bytes[4..8].copy_from_slice(&5u32.to_le_bytes());
        let sc = Syscall::decode_request(&bytes).unwrap();
        assert_eq!(sc.status, SyscallStatus::Pending);
    }

    #[test]
    fn test_kernel_call_types_are_not_ipc() {
        assert!(SyscallType::Send.is_ipc());
        assert!(SyscallType::Recv.is_ipc());
        for raw in 3..=8 {
            let ty = SyscallType::try_from(raw).unwrap();
            assert!(!ty.is_ipc(), "{:?}", ty);
        }
    }

    #[test]
    fn test_encode_into_short_buffer() {
        let mut short = [0u8; SYSCALL_SIZE - 1];
        assert_eq!(Syscall::recv(1).encode(&mut short), Err(AbiError::Truncated));
        let mut long = [0xFFu8; SYSCALL_SIZE + 4];
        Syscall::recv(1).encode(&mut long).unwrap();
        assert_eq!(&long[SYSCALL_SIZE..], &[0xFF; 4]);
    }

    #[test]
    fn test_truncated() {
        assert_eq!(
            Syscall::decode(&[0u8; SYSCALL_SIZE - 1]).unwrap_err(),
            AbiError::Truncated
        );
    }
}
