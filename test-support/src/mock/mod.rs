//! Mock 实现模块
//!
//! 为 `mm` / `kernel` / `sync` 的硬件 trait 提供宿主机上的实现

pub mod arch;
pub mod device;
pub mod kernel;
pub mod mm;
