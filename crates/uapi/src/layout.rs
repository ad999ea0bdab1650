//! 用户可见的固定虚拟地址
//!
//! | 地址          | 用途 |
//! |---------------|------|
//! | 0x8040_0000   | 应用代码与数据（入口）        |
//! | 0x8060_0000   | 启动参数块 [`crate::AppArgs`] |
//! | 0x8060_1000   | 系统调用块 [`crate::Syscall`]，IPC 与 [`crate::KernelCall`] 共用 |
//! | 0x8060_2000   | 工作目录页（所有进程共享）    |
//! | 0x8080_0000   | 应用栈顶（向下增长）          |

/// 应用入口地址
pub const APPS_ENTRY: usize = 0x8040_0000;
/// 启动参数块地址，调度器首次运行进程时写入 a0
pub const APPS_ARG: usize = 0x8060_0000;
/// 系统调用块地址
pub const SYSCALL_ARG: usize = 0x8060_1000;
/// 工作目录页地址
pub const WORK_DIR: usize = 0x8060_2000;
/// 应用栈顶
pub const APPS_STACK_TOP: usize = 0x8080_0000;
/// 装载器为每个应用映射的栈页数
pub const APPS_STACK_PAGES: usize = 4;
