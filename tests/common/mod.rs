//! Every scenario changes process-wide signal state, so each one runs in a
//! forked child and the test inspects how that child ended.

#![allow(dead_code)]

use std::fs::File;
use std::io::Read;
use std::os::unix::io::{AsRawFd, OwnedFd, RawFd};
use std::panic::{catch_unwind, AssertUnwindSafe};

use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{fork, pipe, ForkResult, Pid};

/// Runs `body` in a child process, its return value becomes the exit code
pub fn spawn_child<F: FnOnce() -> i32>(body: F) -> Pid {
    match unsafe { fork() }.expect("fork") {
        ForkResult::Child => {
            let code = catch_unwind(AssertUnwindSafe(body)).unwrap_or(101);
            unsafe { libc::_exit(code) }
        }
        ForkResult::Parent { child } => child,
    }
}

pub fn wait(child: Pid) -> WaitStatus {
    waitpid(child, None).expect("waitpid")
}

pub fn in_child<F: FnOnce() -> i32>(body: F) -> WaitStatus {
    wait(spawn_child(body))
}

pub fn exit_code(status: WaitStatus) -> Option<i32> {
    match status {
        WaitStatus::Exited(_, code) => Some(code),
        _ => None,
    }
}

/// A pipe the child reports through with raw `write(2)` calls, which are
/// fine inside a signal handler
pub struct Report {
    read: OwnedFd,
    write: Option<OwnedFd>,
}

impl Report {
    pub fn new() -> Report {
        let (read, write) = pipe().expect("pipe");
        Report { read, write: Some(write) }
    }

    pub fn fd(&self) -> RawFd {
        self.write.as_ref().expect("writer already closed").as_raw_fd()
    }

    /// Drops the parent's copy of the write end, so a dead child shows up
    /// as end of file
    pub fn close_writer(&mut self) {
        self.write = None;
    }

    /// Everything written until every writer is gone
    pub fn collect(mut self) -> Vec<u8> {
        self.close_writer();
        let mut data = Vec::new();
        File::from(self.read).read_to_end(&mut data).expect("read report");
        data
    }

    /// Blocks until `len` bytes have arrived. Call `close_writer` first.
    pub fn read_exact(&self, len: usize) -> Vec<u8> {
        let mut data = vec![0u8; len];
        let mut file = File::from(self.read.try_clone().expect("dup"));
        file.read_exact(&mut data).expect("read report");
        data
    }
}

/// Async-signal-safe single byte write
pub fn put(fd: RawFd, byte: u8) {
    unsafe {
        libc::write(fd, &byte as *const u8 as *const libc::c_void, 1);
    }
}

pub fn is_pending(signo: libc::c_int) -> bool {
    unsafe {
        let mut set: libc::sigset_t = std::mem::zeroed();
        libc::sigemptyset(&mut set);
        libc::sigpending(&mut set);
        libc::sigismember(&set, signo) == 1
    }
}

/// Keeps deliberately crashing children from writing core files
pub fn no_core_dumps() {
    let limit = libc::rlimit { rlim_cur: 0, rlim_max: 0 };
    unsafe {
        libc::setrlimit(libc::RLIMIT_CORE, &limit);
    }
}
