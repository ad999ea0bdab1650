//! 进程管理服务（[`crate::GPID_PROCESS`]）的消息格式与应用启动参数

use crate::{read_u32, write_u32, AbiError};

/// 参数个数上限
pub const CMD_NARGS: usize = 16;
/// 单个参数长度上限（含结尾 NUL）
pub const CMD_ARG_LEN: usize = 32;

/// 参数表
pub type ArgTable = [[u8; CMD_ARG_LEN]; CMD_NARGS];

const ARGV_SIZE: usize = CMD_NARGS * CMD_ARG_LEN;

/// 把字符串参数打包成定长参数表，返回 `(argc, argv)`
pub fn pack_args(args: &[&str]) -> Result<(usize, ArgTable), AbiError> {
    if args.len() > CMD_NARGS {
        return Err(AbiError::TooManyArgs(args.len()));
    }
    let mut argv = [[0u8; CMD_ARG_LEN]; CMD_NARGS];
    for (slot, arg) in argv.iter_mut().zip(args) {
        let bytes = arg.as_bytes();
        // 留一个字节给 NUL
        if bytes.len() >= CMD_ARG_LEN {
            return Err(AbiError::ArgTooLong(bytes.len()));
        }
        slot[..bytes.len()].copy_from_slice(bytes);
    }
    Ok((args.len(), argv))
}

/// 取出第 `idx` 个参数（到第一个 NUL 为止）
pub fn arg_bytes(argv: &ArgTable, idx: usize) -> Option<&[u8]> {
    let slot = argv.get(idx)?;
    let end = slot.iter().position(|&b| b == 0).unwrap_or(CMD_ARG_LEN);
    Some(&slot[..end])
}

fn encode_argv(argv: &ArgTable, out: &mut [u8]) {
    for (i, slot) in argv.iter().enumerate() {
        out[i * CMD_ARG_LEN..(i + 1) * CMD_ARG_LEN].copy_from_slice(slot);
    }
}

fn decode_argv(bytes: &[u8]) -> ArgTable {
    let mut argv = [[0u8; CMD_ARG_LEN]; CMD_NARGS];
    for (i, slot) in argv.iter_mut().enumerate() {
        slot.copy_from_slice(&bytes[i * CMD_ARG_LEN..(i + 1) * CMD_ARG_LEN]);
    }
    argv
}

/// 进程管理请求类型
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcRequestType {
    /// 创建进程
    Spawn = 0,
    /// 发送者自身退出
    Exit = 1,
    /// 结束全部用户进程
    KillAll = 2,
}

impl TryFrom<u32> for ProcRequestType {
    type Error = AbiError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Spawn),
            1 => Ok(Self::Exit),
            2 => Ok(Self::KillAll),
            other => Err(AbiError::BadRequestType(other)),
        }
    }
}

/// 发往进程管理服务的请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcRequest {
    /// 请求类型
    pub ty: ProcRequestType,
    /// 参数个数
    pub argc: u32,
    /// 参数表，`Spawn` 时 `argv[0]` 为程序名
    pub argv: ArgTable,
}

impl ProcRequest {
    /// 编码长度
    pub const SIZE: usize = 8 + ARGV_SIZE;

    /// 退出请求，内核在用户异常时代为发送
    pub fn exit() -> Self {
        Self {
            ty: ProcRequestType::Exit,
            argc: 0,
            argv: [[0; CMD_ARG_LEN]; CMD_NARGS],
        }
    }

    /// 结束全部用户进程
    pub fn kill_all() -> Self {
        Self {
            ty: ProcRequestType::KillAll,
            ..Self::exit()
        }
    }

    /// 创建进程，`args[0]` 为程序名
    pub fn spawn(args: &[&str]) -> Result<Self, AbiError> {
        let (argc, argv) = pack_args(args)?;
        Ok(Self {
            ty: ProcRequestType::Spawn,
            argc: argc as u32,
            argv,
        })
    }

    /// 编码到定长缓冲区
    pub fn encode_into(&self, out: &mut [u8; Self::SIZE]) {
        write_u32(out, 0, self.ty as u32);
        write_u32(out, 4, self.argc);
        encode_argv(&self.argv, &mut out[8..]);
    }

    /// 编码到 `out`
    pub fn encode(&self, out: &mut [u8]) -> Result<(), AbiError> {
        let out = out.first_chunk_mut::<{ Self::SIZE }>().ok_or(AbiError::Truncated)?;
        self.encode_into(out);
        Ok(())
    }

    /// 编码为定长数组
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        self.encode_into(&mut out);
        out
    }

    /// 从字节解码
    pub fn decode(bytes: &[u8]) -> Result<Self, AbiError> {
        if bytes.len() < Self::SIZE {
            return Err(AbiError::Truncated);
        }
        Ok(Self {
            ty: ProcRequestType::try_from(read_u32(bytes, 0)?)?,
            argc: read_u32(bytes, 4)?,
            argv: decode_argv(&bytes[8..Self::SIZE]),
        })
    }
}

/// 进程管理服务的应答
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcReply {
    /// 成功
    Ok = 0,
    /// 失败
    Error = 1,
}

impl ProcReply {
    /// 编码长度
    pub const SIZE: usize = 4;

    /// 编码
    pub fn to_bytes(self) -> [u8; Self::SIZE] {
        (self as u32).to_le_bytes()
    }

    /// 解码
    pub fn decode(bytes: &[u8]) -> Result<Self, AbiError> {
        match read_u32(bytes, 0)? {
            0 => Ok(Self::Ok),
            1 => Ok(Self::Error),
            other => Err(AbiError::BadReplyType(other)),
        }
    }
}

/// 位于 [`crate::layout::APPS_ARG`] 的启动参数块
///
/// `argc` 在偏移 0，`argv` 紧随其后，因此调度器首次运行进程时
/// a0 = APPS_ARG、a1 = APPS_ARG + 4。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppArgs {
    /// 参数个数
    pub argc: u32,
    /// 参数表
    pub argv: ArgTable,
}

impl AppArgs {
    /// 编码长度
    pub const SIZE: usize = 4 + ARGV_SIZE;

    /// 由字符串参数构造
    pub fn new(args: &[&str]) -> Result<Self, AbiError> {
        let (argc, argv) = pack_args(args)?;
        Ok(Self {
            argc: argc as u32,
            argv,
        })
    }

    /// 由已打包的参数构造
    pub fn from_table(argc: u32, argv: ArgTable) -> Self {
        Self { argc, argv }
    }

    /// 编码到定长缓冲区
    pub fn encode_into(&self, out: &mut [u8; Self::SIZE]) {
        write_u32(out, 0, self.argc);
        encode_argv(&self.argv, &mut out[4..]);
    }

    /// 编码到 `out`
    pub fn encode(&self, out: &mut [u8]) -> Result<(), AbiError> {
        let out = out.first_chunk_mut::<{ Self::SIZE }>().ok_or(AbiError::Truncated)?;
        self.encode_into(out);
        Ok(())
    }

    /// 从字节解码
    pub fn decode(bytes: &[u8]) -> Result<Self, AbiError> {
        if bytes.len() < Self::SIZE {
            return Err(AbiError::Truncated);
        }
        Ok(Self {
            argc: read_u32(bytes, 0)?,
            argv: decode_argv(&bytes[4..Self::SIZE]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_fits_in_message() {
        assert!(ProcRequest::SIZE <= crate::SYSCALL_MSG_LEN);
        assert_eq!(ProcRequest::SIZE, 520);
    }

    #[test]
    fn test_spawn_request() {
        let req = ProcRequest::spawn(&["echo", "hello"]).unwrap();
        let mut buf = [0u8; ProcRequest::SIZE];
        req.encode(&mut buf).unwrap();
        assert_eq!(&buf[0..4], &0u32.to_le_bytes());
        assert_eq!(&buf[4..8], &2u32.to_le_bytes());
        assert_eq!(&buf[8..12], b"echo");
        assert_eq!(&buf[8 + CMD_ARG_LEN..8 + CMD_ARG_LEN + 5], b"hello");

        let back = ProcRequest::decode(&buf).unwrap();
        assert_eq!(arg_bytes(&back.argv, 1), Some(&b"hello"[..]));
    }

    #[test]
    fn test_exit_request_type() {
        let buf = ProcRequest::exit().to_bytes();
        assert_eq!(
            ProcRequest::decode(&buf).unwrap().ty,
            ProcRequestType::Exit
        );
    }

    #[test]
    fn test_arg_limits() {
        let many = ["a"; CMD_NARGS + 1];
        assert_eq!(pack_args(&many).unwrap_err(), AbiError::TooManyArgs(17));

        let raw = [b'x'; CMD_ARG_LEN];
        let long = core::str::from_utf8(&raw).unwrap();
        assert_eq!(
            pack_args(&[long]).unwrap_err(),
            AbiError::ArgTooLong(CMD_ARG_LEN)
        );
    }

    #[test]
    fn test_reply_decode() {
        assert_eq!(ProcReply::decode(&ProcReply::Error.to_bytes()), Ok(ProcReply::Error));
        assert_eq!(
            ProcReply::decode(&7u32.to_le_bytes()),
            Err(AbiError::BadReplyType(7))
        );
    }

    #[test]
    fn test_app_args_argv_offset() {
        let args = AppArgs::new(&["ls", "/home"]).unwrap();
        let mut buf = [0u8; AppArgs::SIZE];
        args.encode(&mut buf).unwrap();
        assert_eq!(&buf[0..4], &2u32.to_le_bytes());
        assert_eq!(&buf[4..6], b"ls");
        assert_eq!(&buf[4 + CMD_ARG_LEN..4 + CMD_ARG_LEN + 5], b"/home");
    }
}
