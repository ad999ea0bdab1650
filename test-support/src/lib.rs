//! 测试支持 crate
//!
//! 提供 Mock 硬件、ELF 构造器，以及在宿主机上搭建一台模拟机器的工具

pub mod elf;
pub mod mock;

use ::kernel::{Kernel, TrapExit, TrapFrame};
use ::mm::address::Vaddr;
use ::mm::{Mmu, Platform, TranslationKind};
use ::uapi::layout::SYSCALL_ARG;
use ::uapi::{AppArgs, KernelCall, KernelReply, Pid, Syscall, SYSCALL_SIZE};

use mock::kernel::MockClint;
use mock::mm::MockPhysMem;

/// 一台模拟机器：内核加上可供检查的硬件句柄
pub struct Machine {
    pub kernel: Kernel,
    pub mem: MockPhysMem,
    pub clint: MockClint,
}

impl Machine {
    /// QEMU 平台，内核地址空间已建立
    pub fn new(kind: TranslationKind) -> Self {
        let mem = MockPhysMem::new();
        let clint = MockClint::new();
        let mut mmu = Mmu::new(mem.boxed(), Platform::Qemu, kind);
        mmu.init_kernel_space().expect("kernel space");
        let kernel = Kernel::new(mmu, clint.boxed());
        Self { kernel, mem, clint }
    }

    /// 分配并装载一个 Ready 状态的进程
    pub fn spawn(&mut self, args: &[&str]) -> Pid {
        let pid = self.kernel.proc_alloc().expect("proc_alloc");
        let image = elf::app_image(&[0x73, 0, 0, 0]);
        let args = AppArgs::new(args).expect("args");
        self.kernel.proc_load(pid, &image, &args).expect("load");
        self.kernel.proc_set_ready(pid).expect("ready");
        pid
    }

    /// 模拟用户程序填写系统调用块
    pub fn write_syscall(&mut self, pid: Pid, sc: &Syscall) {
        self.kernel
            .mmu_mut()
            .copy_to_user(pid, Vaddr(SYSCALL_ARG), &sc.to_bytes())
            .expect("write syscall");
    }

    /// 读取进程用户空间中的系统调用块
    pub fn read_syscall(&mut self, pid: Pid) -> Syscall {
        let mut block = [0u8; SYSCALL_SIZE];
        self.kernel
            .mmu_mut()
            .copy_from_user(pid, Vaddr(SYSCALL_ARG), &mut block)
            .expect("read syscall");
        Syscall::decode(&block).expect("decode syscall")
    }

    /// 核心 `core` 上正在运行的进程
    pub fn running_on(&self, core: usize) -> Option<Pid> {
        self.kernel.cores_info()[core]
    }

    /// 核心 0 上正在运行的进程
    pub fn running(&self) -> Option<Pid> {
        self.running_on(0)
    }

    /// 在核心 `core` 上触发一次陷入
    pub fn trap_on(&mut self, core: usize, mcause: usize, frame: &mut TrapFrame) -> TrapExit {
        self.kernel.kernel_entry(core, mcause, frame)
    }

    /// 在核心 0 上触发一次陷入
    pub fn trap(&mut self, mcause: usize, frame: &mut TrapFrame) -> TrapExit {
        self.trap_on(0, mcause, frame)
    }

    /// 核心 `core` 上的当前进程执行 ecall 发出 `sc`
    pub fn ecall_on(&mut self, core: usize, sc: &Syscall, frame: &mut TrapFrame) -> TrapExit {
        let pid = self.running_on(core).expect("ecall on idle core");
        self.write_syscall(pid, sc);
        self.trap_on(core, 8, frame)
    }

    /// 核心 0 上的当前进程执行 ecall 发出 `sc`
    pub fn ecall(&mut self, sc: &Syscall, frame: &mut TrapFrame) -> TrapExit {
        self.ecall_on(0, sc, frame)
    }

    /// 核心 0 上的当前进程发出内核服务调用，返回写回的应答
    pub fn kernel_call(&mut self, call: &KernelCall, frame: &mut TrapFrame) -> KernelReply {
        let pid = self.running().expect("kernel call on idle core");
        self.ecall(&call.to_syscall(), frame);
        KernelReply::read_from(&self.read_syscall(pid)).expect("reply")
    }

    /// 核心 `core` 上的时钟中断
    pub fn tick_on(&mut self, core: usize, frame: &mut TrapFrame) -> TrapExit {
        self.clint.advance(1_000);
        self.trap_on(core, (1 << 31) | 7, frame)
    }

    /// 核心 0 上的时钟中断
    pub fn tick(&mut self, frame: &mut TrapFrame) -> TrapExit {
        self.tick_on(0, frame)
    }
}
