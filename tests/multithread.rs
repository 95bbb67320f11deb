extern crate libc;
extern crate nix;
extern crate serial_test;
extern crate signal_lifecycle;

mod common;

use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::thread;

use nix::sys::signal::{kill, raise, Signal};
use serial_test::serial;

use signal_lifecycle::{context, init_multithread_foreground, wait_for_signal};
use signal_lifecycle::{set_should_register_signals, SigNum, Waiter};

use common::{exit_code, no_core_dumps, put, spawn_child, wait, Report};

static WAITED: AtomicI32 = AtomicI32::new(0);
static WAITED_CALLS: AtomicUsize = AtomicUsize::new(0);
static FAULT_CALLS: AtomicUsize = AtomicUsize::new(0);

fn on_fault(_: SigNum) {
    FAULT_CALLS.fetch_add(1, Ordering::SeqCst);
}

fn on_request(signo: SigNum) {
    WAITED.store(signo, Ordering::SeqCst);
    WAITED_CALLS.fetch_add(1, Ordering::SeqCst);
}

#[test]
#[serial]
fn interrupt_goes_to_the_waiting_thread() {
    let mut report = Report::new();
    let fd = report.fd();
    let child = spawn_child(move || {
        set_should_register_signals(&[libc::SIGINT, libc::SIGTERM, libc::SIGFPE]).unwrap();
        init_multithread_foreground(None, Some(on_fault), None, false);
        let waiter = thread::spawn(|| wait_for_signal(on_request));
        put(fd, b'r');
        waiter.join().unwrap();
        if WAITED_CALLS.load(Ordering::SeqCst) != 1 {
            return 2;
        }
        if WAITED.load(Ordering::SeqCst) != libc::SIGINT {
            return 3;
        }
        if FAULT_CALLS.load(Ordering::SeqCst) != 0 {
            return 4;
        }
        0
    });
    report.close_writer();
    assert_eq!(report.read_exact(1), b"r");
    kill(child, Signal::SIGINT).unwrap();
    assert_eq!(exit_code(wait(child)), Some(0));
}

#[test]
#[serial]
fn waiter_yields_each_signal() {
    let mut report = Report::new();
    let fd = report.fd();
    let child = spawn_child(move || {
        set_should_register_signals(&[libc::SIGUSR1, libc::SIGTERM, libc::SIGSEGV]).unwrap();
        init_multithread_foreground(None, None, None, false);
        let waiter = thread::spawn(|| {
            let mut got = Waiter::new(context().registry()).take(2).collect::<Vec<_>>();
            got.sort();
            got
        });
        put(fd, b'r');
        let mut expected = vec![libc::SIGUSR1, libc::SIGTERM];
        expected.sort();
        if waiter.join().unwrap() != expected {
            return 2;
        }
        0
    });
    report.close_writer();
    assert_eq!(report.read_exact(1), b"r");
    kill(child, Signal::SIGUSR1).unwrap();
    kill(child, Signal::SIGTERM).unwrap();
    assert_eq!(exit_code(wait(child)), Some(0));
}

fn exit_with_fault(signo: SigNum) {
    unsafe { libc::_exit(100 + signo) }
}

#[test]
#[serial]
fn faults_stay_asynchronous() {
    let child = spawn_child(|| {
        no_core_dumps();
        set_should_register_signals(&[libc::SIGINT, libc::SIGFPE]).unwrap();
        init_multithread_foreground(None, Some(exit_with_fault), None, false);
        raise(Signal::SIGFPE).unwrap();
        1
    });
    assert_eq!(exit_code(wait(child)), Some(100 + libc::SIGFPE));
}
