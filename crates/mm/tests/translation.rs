//! Integration tests: translation.
use mm::address::{PageId, Paddr, Vaddr, Vpn};
use mm::config::{APPS_ENTRY, PAGE_SIZE, RAM_START, WORK_DIR};
use mm::{Mmu, PageState, PagingError, Platform, SATP_MODE_SV32, TranslationKind};
use test_support::mock::mm::MockPhysMem;

fn mmu(kind: TranslationKind) -> (Mmu, MockPhysMem) {
    let mem = MockPhysMem::new();
    (Mmu::new(mem.boxed(), Platform::Qemu, kind), mem)
}

fn vpn(addr: usize) -> Vpn {
    Vpn(addr / PAGE_SIZE)
}

fn app_vpn(i: usize) -> Vpn {
    Vpn(APPS_ENTRY / PAGE_SIZE + i)
}

#[test]
fn test_free_releases_every_page_of_pid() {
    let (mut mmu, _mem) = mmu(TranslationKind::SoftTlb);
    let pages: Vec<PageId> = (0..3).map(|_| mmu.alloc().unwrap()).collect();
    for (i, &page) in pages.iter().enumerate() {
        mmu.map(5, app_vpn(i), page).unwrap();
    }
    mmu.free(5);
    for page in pages {
        assert_eq!(mmu.frames().state(page), Some(PageState::Free));
        assert_eq!(mmu.frames().state(page).and_then(|s| s.owner()), None);
    }
}

#[test]
fn test_pages_never_have_two_owners() {
    let (mut mmu, _mem) = mmu(TranslationKind::SoftTlb);
    let a = mmu.alloc().unwrap();
    mmu.map(5, vpn(APPS_ENTRY), a).unwrap();
    assert!(matches!(
        mmu.map(6, vpn(APPS_ENTRY), a),
        Err(PagingError::NotOwner { .. })
    ));

    // 回收后页可以被另一个进程重新拥有
    mmu.free(5);
    let b = mmu.alloc().unwrap();
    assert_eq!(a, b);
    mmu.map(6, vpn(APPS_ENTRY), b).unwrap();
    assert_eq!(mmu.frames().state(b).and_then(|s| s.owner()), Some(6));
}

#[test]
fn test_map_requires_allocated_page() {
    let (mut mmu, _mem) = mmu(TranslationKind::PageTable);
    assert_eq!(
        mmu.map(5, vpn(APPS_ENTRY), PageId(10)),
        Err(PagingError::NotAllocated(PageId(10)))
    );
}

#[test]
fn test_page_table_translate_page_seven() {
    let (mut mmu, _mem) = mmu(TranslationKind::PageTable);
    for _ in 0..3 {
        mmu.alloc().unwrap();
    }
    mmu.map(9, Vpn(7), PageId(2)).unwrap();
    let pa = mmu.translate(9, Vaddr(7 * PAGE_SIZE + 100)).unwrap();
    assert_eq!(pa, PageId(2).paddr().add(100));
}

#[test]
fn test_page_table_translation_round_trip() {
    let (mut mmu, _mem) = mmu(TranslationKind::PageTable);
    let pages: Vec<PageId> = (0..4).map(|_| mmu.alloc().unwrap()).collect();
    for (i, &page) in pages.iter().enumerate() {
        mmu.map(6, app_vpn(i), page).unwrap();
    }
    for (i, &page) in pages.iter().enumerate() {
        for offset in [0, 1, 100, PAGE_SIZE / 2, PAGE_SIZE - 1] {
            let va = Vaddr(APPS_ENTRY + i * PAGE_SIZE + offset);
            assert_eq!(mmu.translate(6, va).unwrap(), page.paddr().add(offset));
        }
    }
    assert_eq!(
        mmu.translate(6, Vaddr(APPS_ENTRY + 4 * PAGE_SIZE)),
        Err(PagingError::NotMapped(6, Vaddr(APPS_ENTRY + 4 * PAGE_SIZE)))
    );
}

#[test]
fn test_page_table_first_mapping_wins() {
    let (mut mmu, _mem) = mmu(TranslationKind::PageTable);
    let first = mmu.alloc().unwrap();
    let second = mmu.alloc().unwrap();
    mmu.map(6, vpn(APPS_ENTRY), first).unwrap();
    mmu.map(6, vpn(APPS_ENTRY), second).unwrap();
    assert_eq!(mmu.translate(6, Vaddr(APPS_ENTRY)).unwrap(), first.paddr());
}

#[test]
fn test_page_table_switch_is_idempotent() {
    let (mut mmu, mem) = mmu(TranslationKind::PageTable);
    let page = mmu.alloc().unwrap();
    mmu.map(6, vpn(APPS_ENTRY), page).unwrap();
    mmu.switch(6).unwrap();
    let once = mem.satp();
    mmu.switch(6).unwrap();
    assert_eq!(mem.satp(), once);
    assert_eq!(mem.page_copies(), 0);
}

#[test]
fn test_page_table_switch_without_space_fails() {
    let (mut mmu, _mem) = mmu(TranslationKind::PageTable);
    assert_eq!(mmu.switch(7), Err(PagingError::NoAddressSpace(7)));
}

#[test]
fn test_kernel_identity_map() {
    let (mut mmu, mem) = mmu(TranslationKind::PageTable);
    mmu.init_kernel_space().unwrap();
    let satp = mem.satp().expect("satp written");
    assert_ne!(satp & SATP_MODE_SV32, 0);

    for addr in [RAM_START, RAM_START + 0x12_3456, APPS_ENTRY + 8] {
        assert_eq!(mmu.translate(0, Vaddr(addr)).unwrap(), Paddr(addr));
    }
    let uart = Platform::Qemu.uart_base();
    assert_eq!(mmu.translate(0, Vaddr(uart + 4)).unwrap(), Paddr(uart + 4));
}

#[test]
fn test_system_pid_shares_kernel_region() {
    let (mut mmu, _mem) = mmu(TranslationKind::PageTable);
    mmu.init_kernel_space().unwrap();
    let page = mmu.alloc().unwrap();
    mmu.map(2, vpn(APPS_ENTRY), page).unwrap();
    assert_eq!(mmu.translate(2, Vaddr(RAM_START + 0x40)).unwrap(), Paddr(RAM_START + 0x40));

    let page = mmu.alloc().unwrap();
    mmu.map(6, vpn(APPS_ENTRY), page).unwrap();
    assert!(mmu.translate(6, Vaddr(RAM_START + 0x40)).is_err());
}

#[test]
fn test_work_dir_page_is_shared() {
    let (mut mmu, _mem) = mmu(TranslationKind::PageTable);
    let a = mmu.alloc().unwrap();
    let b = mmu.alloc().unwrap();
    mmu.map(5, vpn(APPS_ENTRY), a).unwrap();
    mmu.map(6, vpn(APPS_ENTRY), b).unwrap();
    let wa = mmu.translate(5, Vaddr(WORK_DIR)).unwrap();
    let wb = mmu.translate(6, Vaddr(WORK_DIR)).unwrap();
    assert_eq!(wa, wb);

    // 工作目录页不随进程回收
    mmu.free(5);
    assert_eq!(mmu.translate(6, Vaddr(WORK_DIR)).unwrap(), wb);
}

#[test]
fn test_page_table_accepts_large_pids() {
    let (mut mmu, _mem) = mmu(TranslationKind::PageTable);
    let page = mmu.alloc().unwrap();
    mmu.map(300, vpn(APPS_ENTRY), page).unwrap();
    mmu.switch(300).unwrap();
    assert_eq!(mmu.translate(300, Vaddr(APPS_ENTRY + 4)).unwrap(), page.paddr().add(4));
    mmu.free(300);
    assert_eq!(mmu.switch(300), Err(PagingError::NoAddressSpace(300)));
}

#[test]
fn test_free_drops_address_space() {
    let (mut mmu, _mem) = mmu(TranslationKind::PageTable);
    let page = mmu.alloc().unwrap();
    mmu.map(5, vpn(APPS_ENTRY), page).unwrap();
    mmu.free(5);
    assert_eq!(mmu.switch(5), Err(PagingError::NoAddressSpace(5)));
}

#[test]
fn test_soft_tlb_isolates_processes() {
    let (mut mmu, mem) = mmu(TranslationKind::SoftTlb);
    let a = mmu.alloc().unwrap();
    let b = mmu.alloc().unwrap();
    mmu.map(5, vpn(APPS_ENTRY), a).unwrap();
    mmu.map(6, vpn(APPS_ENTRY), b).unwrap();

    mmu.copy_to_user(5, Vaddr(APPS_ENTRY), b"five").unwrap();
    mmu.copy_to_user(6, Vaddr(APPS_ENTRY), b"six!").unwrap();

    let mut buf = [0u8; 4];
    mmu.copy_from_user(5, Vaddr(APPS_ENTRY), &mut buf).unwrap();
    assert_eq!(&buf, b"five");
    // 切走之后 5 的内容已写回它自己的物理页
    mmu.switch(6).unwrap();
    assert_eq!(mem.read(a.paddr().0, 4), b"five");
    assert_eq!(mem.read(APPS_ENTRY, 4), b"six!");
}

#[test]
fn test_soft_tlb_translate_is_identity() {
    let (mut mmu, _mem) = mmu(TranslationKind::SoftTlb);
    let page = mmu.alloc().unwrap();
    mmu.map(5, vpn(APPS_ENTRY), page).unwrap();
    let va = Vaddr(APPS_ENTRY + 123);
    assert_eq!(mmu.translate(5, va).unwrap(), Paddr(va.0));
}

#[test]
fn test_soft_tlb_double_switch_copies_once() {
    let (mut mmu, mem) = mmu(TranslationKind::SoftTlb);
    for i in 0..3 {
        let page = mmu.alloc().unwrap();
        mmu.map(5, app_vpn(i), page).unwrap();
    }
    mmu.switch(5).unwrap();
    let copies = mem.page_copies();
    assert_eq!(copies, 3);
    mmu.switch(5).unwrap();
    assert_eq!(mem.page_copies(), copies);
}

#[test]
fn test_flush_cache_per_platform() {
    let mem = MockPhysMem::new();
    let qemu = Mmu::new(mem.boxed(), Platform::Qemu, TranslationKind::SoftTlb);
    qemu.flush_cache();
    assert_eq!((mem.tlb_flushes(), mem.icache_flushes()), (0, 0));

    let arty = Mmu::new(mem.boxed(), Platform::Arty, TranslationKind::PageTable);
    arty.flush_cache();
    assert_eq!((mem.tlb_flushes(), mem.icache_flushes()), (1, 1));
}
