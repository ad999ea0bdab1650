//! Integration tests: ipc.
use kernel::{ProcStatus, TrapExit, TrapFrame};
use mm::TranslationKind;
use uapi::{GPID_ALL, Pid, ProcRequest, ProcRequestType, Syscall, SyscallStatus};
use test_support::Machine;

fn status(m: &Machine, pid: Pid) -> ProcStatus {
    m.kernel.procs().get(pid).expect("live process").status
}

fn hello_rendezvous(kind: TranslationKind) {
    let mut m = Machine::new(kind);
    let a = m.spawn(&["sender"]);
    let b = m.spawn(&["receiver"]);
    let mut frame = TrapFrame::default();

    m.tick(&mut frame);
    assert_eq!(m.running(), Some(a));

    // 接收者还没有 recv，发送者只能挂起
    m.ecall(&Syscall::send(b, b"hello").unwrap(), &mut frame);
    assert_eq!(status(&m, a), ProcStatus::PendingSyscall);
    assert_eq!(m.running(), Some(b));

    m.ecall(&Syscall::recv(GPID_ALL), &mut frame);
    assert_eq!(m.running(), Some(b));
    assert_eq!(status(&m, a), ProcStatus::Runnable);
    assert_eq!(frame.mepc, uapi::layout::APPS_ENTRY + 4);

    let got = m.read_syscall(b);
    assert_eq!(got.status, SyscallStatus::Done);
    assert_eq!(got.sender, a);
    assert_eq!(&got.content[..5], b"hello");
    assert!(got.content[5..].iter().all(|&c| c == 0));
}

#[test]
fn test_send_before_recv_soft_tlb() {
    hello_rendezvous(TranslationKind::SoftTlb);
}

#[test]
fn test_send_before_recv_page_table() {
    hello_rendezvous(TranslationKind::PageTable);
}

#[test]
fn test_recv_before_send_releases_both() {
    let mut m = Machine::new(TranslationKind::SoftTlb);
    let a = m.spawn(&[]);
    let b = m.spawn(&[]);
    let mut frame = TrapFrame::default();

    m.tick(&mut frame);
    m.ecall(&Syscall::recv(b), &mut frame);
    assert_eq!(m.running(), Some(b));

    let msg = [7u8; 1024];
    m.ecall(&Syscall::send(a, &msg).unwrap(), &mut frame);
    // 一次扫描中同时完成投递和拷回，接收者紧接着被选中
    assert_eq!(m.running(), Some(a));
    assert_eq!(status(&m, a), ProcStatus::Running);
    assert_eq!(status(&m, b), ProcStatus::Runnable);
    assert_eq!(m.read_syscall(a).content, msg);
}

#[test]
fn test_recv_filter_ignores_other_senders() {
    let mut m = Machine::new(TranslationKind::SoftTlb);
    let server = m.spawn(&[]);
    let a = m.spawn(&[]);
    let b = m.spawn(&[]);
    let mut frame = TrapFrame::default();

    m.tick(&mut frame);
    m.ecall(&Syscall::recv(b), &mut frame);
    assert_eq!(m.running(), Some(a));
    m.ecall(&Syscall::send(server, b"from a").unwrap(), &mut frame);
    assert_eq!(m.running(), Some(b));
    assert_eq!(status(&m, server), ProcStatus::PendingSyscall);
    assert_eq!(status(&m, a), ProcStatus::PendingSyscall);

    m.ecall(&Syscall::send(server, b"from b").unwrap(), &mut frame);
    assert_eq!(m.running(), Some(server));
    let got = m.read_syscall(server);
    assert_eq!(got.sender, b);
    assert_eq!(&got.content[..6], b"from b");
    assert_eq!(status(&m, a), ProcStatus::PendingSyscall);
}

#[test]
fn test_blocked_parties_leave_core_idle() {
    let mut m = Machine::new(TranslationKind::SoftTlb);
    m.spawn(&[]);
    let mut frame = TrapFrame::default();
    m.tick(&mut frame);
    assert_eq!(m.ecall(&Syscall::recv(GPID_ALL), &mut frame), TrapExit::Idle);
    assert_eq!(m.running(), None);

    // 之后的时钟中断仍然找不到可运行的进程
    assert_eq!(m.tick(&mut frame), TrapExit::Idle);
}

#[test]
#[should_panic(expected = "unknown receiver")]
fn test_send_to_unknown_pid_is_fatal() {
    let mut m = Machine::new(TranslationKind::SoftTlb);
    m.spawn(&[]);
    let mut frame = TrapFrame::default();
    m.tick(&mut frame);
    m.ecall(&Syscall::send(42, b"?").unwrap(), &mut frame);
}

fn fault_sends_exit(kind: TranslationKind) {
    let mut m = Machine::new(kind);
    let server = m.spawn(&["sys_proc"]);
    let app = m.spawn(&["crash"]);
    let mut frame = TrapFrame::default();

    m.tick(&mut frame);
    m.ecall(&Syscall::recv(GPID_ALL), &mut frame);
    assert_eq!(m.running(), Some(app));

    // 非法访存（load page fault）
    m.clint.set_fault_addr(0x10);
    let exit = m.trap(13, &mut frame);
    assert!(matches!(exit, TrapExit::Resume { .. }));
    assert_eq!(m.running(), Some(server));

    let got = m.read_syscall(server);
    assert_eq!(got.sender, app);
    let req = ProcRequest::decode(&got.content).unwrap();
    assert_eq!(req.ty, ProcRequestType::Exit);

    // 出错的进程不会再运行
    assert!(m.kernel.procs().get(app).unwrap().exiting);
    for _ in 0..4 {
        m.tick(&mut frame);
        assert_ne!(m.running(), Some(app));
    }

    m.kernel.proc_free(app).unwrap();
    assert!(m.kernel.procs().get(app).is_none());
    assert_eq!(m.kernel.mmu().frames().resident_pages(app).count(), 0);
}

#[test]
fn test_fault_sends_exit_to_process_server_soft_tlb() {
    fault_sends_exit(TranslationKind::SoftTlb);
}

#[test]
fn test_fault_sends_exit_to_process_server_page_table() {
    fault_sends_exit(TranslationKind::PageTable);
}

#[test]
fn test_unknown_syscall_type_is_a_fault() {
    let mut m = Machine::new(TranslationKind::SoftTlb);
    let server = m.spawn(&[]);
    let app = m.spawn(&[]);
    let mut frame = TrapFrame::default();

    m.tick(&mut frame);
    m.ecall(&Syscall::recv(GPID_ALL), &mut frame);
    let bogus = Syscall {
        ty: 9,
        ..Syscall::default()
    };
    m.ecall(&bogus, &mut frame);
    assert_eq!(m.running(), Some(server));
    assert_eq!(m.read_syscall(server).sender, app);
    assert_eq!(status(&m, app), ProcStatus::PendingSyscall);
}
