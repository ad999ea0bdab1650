//! 进程号与系统服务进程号

/// 进程号
///
/// 与 C 侧 `int` 一致，负值仅用作通配符 [`GPID_ALL`]。
pub type Pid = i32;

/// 通配：recv 时表示接受任意发送者，`proc_free` 时表示全部用户进程
pub const GPID_ALL: Pid = -1;
/// 保留，不对应任何进程
pub const GPID_UNUSED: Pid = 0;
/// 进程管理服务
pub const GPID_PROCESS: Pid = 1;
/// 终端服务
pub const GPID_TERMINAL: Pid = 2;
/// 文件服务
pub const GPID_FILE: Pid = 3;
/// shell
pub const GPID_SHELL: Pid = 4;
/// 最大核心数
pub const NCORES: usize = 4;

/// 第一个用户应用的进程号，小于它的都是系统进程
pub const GPID_USER_START: Pid = 5;

/// 是否为系统进程（含 0 号内核身份映射）
#[inline]
pub const fn is_system_pid(pid: Pid) -> bool {
    pid >= 0 && pid < GPID_USER_START
}
