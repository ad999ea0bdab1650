//! Integration tests: boot.
use kernel::config::{BLOCK_SIZE, SYS_EXEC_SIZE, SYS_PROC_EXEC_START};
use kernel::loader::{self, LoadError};
use kernel::timer::TIMER_DISARMED;
use kernel::{BootEntry, PrivMode, ProcStatus, Timer, choose_translation};
use mm::address::Vaddr;
use mm::config::PAGE_SIZE;
use mm::TranslationKind;
use test_support::Machine;
use test_support::elf::{ElfBuilder, app_image};
use test_support::mock::device::{MockDisk, MockTty};
use test_support::mock::kernel::MockClint;
use uapi::layout::{APPS_ARG, APPS_ENTRY, APPS_STACK_TOP, SYSCALL_ARG};
use uapi::proc::arg_bytes;
use uapi::{AppArgs, GPID_PROCESS};

#[test]
fn test_mtime_retries_on_carry() {
    let clint = MockClint::new();
    // 第一次读取时低位恰好进位
    clint.script_reads(&[1, 0xFFFF_FFFF, 2, 2, 5, 2]);
    assert_eq!(Timer::mtime(&clint), (2 << 32) | 5);
}

#[test]
fn test_timer_init_disarms() {
    let clint = MockClint::new();
    Timer::new(100).init(&clint, 2);
    assert_eq!(clint.mtimecmp(2), Some(TIMER_DISARMED));
}

#[test]
fn test_choose_translation_skips_noise() {
    let mut tty = MockTty::with_input(b"x91");
    assert_eq!(choose_translation(&mut tty), TranslationKind::SoftTlb);
    assert!(tty.output_str().contains("Enter 0"));
    // '1' 之后的输入没有被读走
    assert!(tty.input.is_empty());

    let mut tty = MockTty::with_input(b"\r0");
    assert_eq!(choose_translation(&mut tty), TranslationKind::PageTable);
}

#[test]
fn test_loader_maps_segments_args_and_stack() {
    let mut m = Machine::new(TranslationKind::PageTable);
    let pid = m.kernel.proc_alloc().unwrap();
    let image = ElfBuilder::new(APPS_ENTRY as u32)
        .segment(APPS_ENTRY as u32, b"code")
        .bss_segment((APPS_ENTRY + 0x2ff0) as u32, b"0123456789abcdefXY", 0x2000)
        .build();
    let args = AppArgs::new(&["echo", "hi"]).unwrap();
    m.kernel.proc_load(pid, &image, &args).unwrap();

    let mmu = m.kernel.mmu_mut();
    let mut buf = [0u8; 4];
    mmu.copy_from_user(pid, Vaddr(APPS_ENTRY), &mut buf).unwrap();
    assert_eq!(&buf, b"code");

    // 跨页的段内容完整，段尾清零
    let mut data = [0xAAu8; 20];
    mmu.copy_from_user(pid, Vaddr(APPS_ENTRY + 0x2ff0), &mut data).unwrap();
    assert_eq!(&data[..18], b"0123456789abcdefXY");
    assert_eq!(&data[18..], &[0, 0]);

    let mut block = [0u8; AppArgs::SIZE];
    mmu.copy_from_user(pid, Vaddr(APPS_ARG), &mut block).unwrap();
    let got = AppArgs::decode(&block).unwrap();
    assert_eq!(got.argc, 2);
    assert_eq!(arg_bytes(&got.argv, 1), Some(&b"hi"[..]));

    assert!(mmu.translate(pid, Vaddr(SYSCALL_ARG)).is_ok());
    assert!(mmu.translate(pid, Vaddr(APPS_STACK_TOP - 4)).is_ok());
    assert!(mmu.translate(pid, Vaddr(APPS_STACK_TOP - 4 * PAGE_SIZE)).is_ok());
    assert!(mmu.translate(pid, Vaddr(APPS_STACK_TOP - 5 * PAGE_SIZE)).is_err());
}

#[test]
fn test_loader_rejects_other_machines() {
    let mut m = Machine::new(TranslationKind::SoftTlb);
    let pid = m.kernel.proc_alloc().unwrap();
    let image = ElfBuilder::new(APPS_ENTRY as u32)
        .machine(0x3E)
        .segment(APPS_ENTRY as u32, b"code")
        .build();
    assert_eq!(
        m.kernel.proc_load(pid, &image, &AppArgs::default()),
        Err(LoadError::NotRiscv32)
    );
}

#[test]
fn test_loader_rejects_segment_outside_code_region() {
    let mut m = Machine::new(TranslationKind::SoftTlb);
    let pid = m.kernel.proc_alloc().unwrap();
    let image = ElfBuilder::new(APPS_ENTRY as u32)
        .segment(0x8000_0000, b"kernel")
        .build();
    assert_eq!(
        m.kernel.proc_load(pid, &image, &AppArgs::default()),
        Err(LoadError::SegmentOutOfRange {
            start: 0x8000_0000,
            end: 0x8000_0006
        })
    );
}

#[test]
fn test_loader_rejects_garbage() {
    let mut m = Machine::new(TranslationKind::SoftTlb);
    let pid = m.kernel.proc_alloc().unwrap();
    let result = m.kernel.proc_load(pid, &[0u8; 64], &AppArgs::default());
    assert!(matches!(result, Err(LoadError::Elf(_))));
}

#[test]
fn test_loader_rejects_wrapping_segment() {
    let mut m = Machine::new(TranslationKind::SoftTlb);
    let pid = m.kernel.proc_alloc().unwrap();
    let image = ElfBuilder::new(APPS_ENTRY as u32)
        .bss_segment(APPS_ENTRY as u32, b"x", 0xFFFF_FFFF)
        .build();
    let result = m.kernel.proc_load(pid, &image, &AppArgs::default());
    assert!(matches!(result, Err(LoadError::Elf(_))), "{:?}", result);
}

#[test]
fn test_loader_rejects_wrapping_file_offset() {
    let mut m = Machine::new(TranslationKind::SoftTlb);
    let pid = m.kernel.proc_alloc().unwrap();
    let mut image = app_image(&[0x13; 32]);
    // 第一个程序头的 p_offset
    image[56..60].copy_from_slice(&0xFFFF_FFF0u32.to_le_bytes());
    let result = m.kernel.proc_load(pid, &image, &AppArgs::default());
    assert!(matches!(result, Err(LoadError::Elf(_))), "{:?}", result);
}

#[test]
fn test_read_image_reads_whole_slot() {
    let start = SYS_PROC_EXEC_START;
    let mut disk = MockDisk::new(start as usize + SYS_EXEC_SIZE / BLOCK_SIZE);
    disk.put(start, b"head");
    disk.put(start + 511, b"tail");
    let image = loader::read_image(&mut disk, start);
    assert_eq!(image.len(), SYS_EXEC_SIZE);
    assert_eq!(&image[..4], b"head");
    assert_eq!(&image[511 * BLOCK_SIZE..511 * BLOCK_SIZE + 4], b"tail");
}

#[test]
fn test_grass_entry_starts_process_server() {
    let mut m = Machine::new(TranslationKind::PageTable);
    let start = SYS_PROC_EXEC_START;
    let mut disk = MockDisk::new(start as usize + SYS_EXEC_SIZE / BLOCK_SIZE);
    disk.put(start, &app_image(b"sys_proc"));

    let entry = m.kernel.grass_entry(0, &mut disk).unwrap();
    assert_eq!(
        entry,
        BootEntry {
            pid: GPID_PROCESS,
            entry: APPS_ENTRY,
            arg: APPS_ARG,
            mode: PrivMode::Machine,
        }
    );
    assert_eq!(m.running(), Some(GPID_PROCESS));
    let server = m.kernel.procs().get(GPID_PROCESS).unwrap();
    assert_eq!(server.status, ProcStatus::Running);
    assert_eq!(server.schedule_count, 1);
    assert!(m.mem.tlb_flushes() >= 1);

    let mut code = [0u8; 8];
    m.kernel
        .mmu_mut()
        .copy_from_user(GPID_PROCESS, Vaddr(APPS_ENTRY), &mut code)
        .unwrap();
    assert_eq!(&code, b"sys_proc");
}

#[test]
fn test_grass_entry_fails_on_empty_disk() {
    let mut m = Machine::new(TranslationKind::SoftTlb);
    let mut disk = MockDisk::new(SYS_PROC_EXEC_START as usize + SYS_EXEC_SIZE / BLOCK_SIZE);
    assert!(m.kernel.grass_entry(0, &mut disk).is_err());
}
