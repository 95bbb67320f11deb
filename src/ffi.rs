//! Thin wrappers around libc signal primitives
//!
//! Everything reachable from an asynchronous signal handler lives here and is
//! restricted to async-signal-safe calls: `_exit`, `sigaction`,
//! `raise`, `fork` and `abort`. No allocation, no locks, no logging.
//!
//! The sigset helpers work on raw signal numbers, so real-time signals that
//! `nix::sys::signal::Signal` cannot express are covered too.

use std::mem;
use std::ptr::null_mut;

use libc::{self, c_int, pid_t, sigset_t};
use nix::errno::Errno;
use nix::sys::signal::{self, SigHandler, Signal};

use crate::SigNum;

/// A signal set addressed by raw signal numbers
#[derive(Clone, Copy)]
pub struct RawSigSet {
    inner: sigset_t,
}

impl RawSigSet {
    pub fn empty() -> RawSigSet {
        unsafe {
            let mut inner: sigset_t = mem::zeroed();
            libc::sigemptyset(&mut inner);
            RawSigSet { inner }
        }
    }

    pub fn add(&mut self, signo: SigNum) -> nix::Result<()> {
        Errno::result(unsafe { libc::sigaddset(&mut self.inner, signo) }).map(drop)
    }

    pub fn contains(&self, signo: SigNum) -> bool {
        unsafe { libc::sigismember(&self.inner, signo) == 1 }
    }

    /// Single-signal set
    pub fn of(signo: SigNum) -> nix::Result<RawSigSet> {
        let mut set = RawSigSet::empty();
        set.add(signo)?;
        Ok(set)
    }
}

impl AsRef<sigset_t> for RawSigSet {
    fn as_ref(&self) -> &sigset_t {
        &self.inner
    }
}

/// Changes the signal mask of the calling thread. Threads spawned afterwards
/// inherit it.
pub fn thread_mask(how: c_int, set: &RawSigSet) -> nix::Result<()> {
    // pthread_sigmask reports the error number instead of setting errno
    match unsafe { libc::pthread_sigmask(how, set.as_ref(), null_mut()) } {
        0 => Ok(()),
        err => Err(Errno::from_raw(err)),
    }
}

pub fn pending() -> nix::Result<RawSigSet> {
    let mut set = RawSigSet::empty();
    Errno::result(unsafe { libc::sigpending(&mut set.inner) })?;
    Ok(set)
}

/// Dequeues one pending signal out of `set`, blocking until there is one
pub fn sigwait(set: &RawSigSet) -> nix::Result<SigNum> {
    let mut sig: SigNum = 0;
    loop {
        match unsafe { libc::sigwait(set.as_ref(), &mut sig) } {
            0 => return Ok(sig),
            libc::EINTR => continue,
            err => return Err(Errno::from_raw(err)),
        }
    }
}

// Async-signal-safe operations

pub fn exit_now(code: c_int) -> ! {
    unsafe { libc::_exit(code) }
}

pub fn abort() -> ! {
    unsafe { libc::abort() }
}

/// Puts the default disposition back for `SIGABRT`, so the next abort is
/// not intercepted
pub fn reset_abort() -> bool {
    unsafe { signal::signal(Signal::SIGABRT, SigHandler::SigDfl) }.is_ok()
}

pub fn raise(sig: Signal) -> bool {
    signal::raise(sig).is_ok()
}

/// Raw `fork`: returns the child's pid in the parent, 0 in the child and a
/// negative value on failure
pub fn fork() -> pid_t {
    unsafe { libc::fork() }
}
