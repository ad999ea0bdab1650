//! 内存管理子系统（earth 层）
//!
//! 提供地址抽象、动态页池分配和两种可互换的地址翻译机制。
//!
//! # 架构解耦
//!
//! 所有物理内存访问和 satp / TLB / 指令缓存操作都经过 [`ArchMmOps`]，
//! 由 os crate 为真实硬件实现，测试中由模拟内存实现。
//! 内核只通过 [`Mmu`] 门面使用本 crate。

#![no_std]

extern crate alloc;

mod arch_ops;
mod error;
mod mmu;

pub mod address;
pub mod config;
pub mod frame_allocator;
pub mod translation;

pub use arch_ops::{ArchMmOps, SATP_MODE_SV32, satp_value};
pub use config::{Platform, TranslationKind};
pub use error::{PagingError, PagingResult};
pub use frame_allocator::{FrameAllocator, PageState};
pub use mmu::Mmu;
