//! Installing signal dispositions
//!
//! Two ways to take a signal over:
//!
//! 1. `install_direct` sets a handler that runs asynchronously, interrupting
//!    whatever the receiving thread was doing
//! 2. `install_blocking` masks the signal out so it stays pending until a
//!    dedicated thread picks it up with `sigwait` (see `trap`)
//!
//! The segmentation fault handler runs on an alternate stack, so faults
//! caused by stack exhaustion can still be serviced.

use std::mem;

use libc::{self, c_int, c_void, siginfo_t};
use nix::errno::Errno;
use nix::sys::signal::SigHandler;

use crate::error::{Error, Result};
use crate::fault::is_uncatchable;
use crate::ffi::{thread_mask, RawSigSet};
use crate::registry::{is_valid, SignalRegistry};
use crate::SigNum;

/// Size of the alternate stack used by the segmentation fault handler
pub const ALT_STACK_SIZE: usize = 4 * libc::SIGSTKSZ;

#[cfg(feature = "alt-stack")]
static mut ALT_STACK: [u8; ALT_STACK_SIZE] = [0; ALT_STACK_SIZE];

/// Bytes reserved for the alternate signal stack, zero when the `alt-stack`
/// feature is disabled
pub fn alternate_stack_size() -> usize {
    if cfg!(feature = "alt-stack") {
        ALT_STACK_SIZE
    } else {
        0
    }
}

extern "C" fn empty_handler(_: c_int) {}

fn check(signo: SigNum) -> Result<()> {
    if !is_valid(signo) {
        return Err(Error::InvalidSignal(signo));
    }
    if is_uncatchable(signo) {
        return Err(Error::Uncatchable(signo));
    }
    Ok(())
}

/// Makes the alternate stack current for the calling thread
#[cfg(feature = "alt-stack")]
fn use_alt_stack() -> Result<bool> {
    let stack = libc::stack_t {
        ss_sp: unsafe { std::ptr::addr_of_mut!(ALT_STACK) } as *mut c_void,
        ss_flags: 0,
        ss_size: ALT_STACK_SIZE,
    };
    Errno::result(unsafe { libc::sigaltstack(&stack, std::ptr::null_mut()) })
        .map_err(Error::sys("sigaltstack"))?;
    Ok(true)
}

#[cfg(not(feature = "alt-stack"))]
fn use_alt_stack() -> Result<bool> {
    Ok(false)
}

fn previous(act: &libc::sigaction) -> SigHandler {
    match act.sa_sigaction {
        libc::SIG_DFL => SigHandler::SigDfl,
        libc::SIG_IGN => SigHandler::SigIgn,
        raw if act.sa_flags & libc::SA_SIGINFO != 0 => SigHandler::SigAction(unsafe {
            mem::transmute::<usize, extern "C" fn(c_int, *mut siginfo_t, *mut c_void)>(raw)
        }),
        raw => SigHandler::Handler(unsafe { mem::transmute::<usize, extern "C" fn(c_int)>(raw) }),
    }
}

/// Installs `handler` to run asynchronously for `signo` and returns the
/// handler that was there before.
///
/// Interrupted system calls are restarted, except for `SIGALRM` which is
/// meant to interrupt them.
pub fn install_direct(signo: SigNum, handler: SigHandler) -> Result<SigHandler> {
    check(signo)?;
    unsafe {
        let mut act: libc::sigaction = mem::zeroed();
        let mut old: libc::sigaction = mem::zeroed();
        libc::sigemptyset(&mut act.sa_mask);
        act.sa_sigaction = match handler {
            SigHandler::SigDfl => libc::SIG_DFL,
            SigHandler::SigIgn => libc::SIG_IGN,
            SigHandler::Handler(func) => func as usize,
            SigHandler::SigAction(func) => {
                act.sa_flags |= libc::SA_SIGINFO;
                func as usize
            }
        };
        if signo != libc::SIGALRM {
            act.sa_flags |= libc::SA_RESTART;
        }
        if signo == libc::SIGSEGV && use_alt_stack()? {
            act.sa_flags |= libc::SA_ONSTACK;
        }
        Errno::result(libc::sigaction(signo, &act, &mut old))
            .map_err(Error::sys("sigaction"))?;
        Ok(previous(&old))
    }
}

/// Blocks `signo` for the calling thread (and every thread it spawns
/// afterwards) and replaces its disposition by a no-op handler, so even
/// signals ignored by default become pending and can be waited for.
pub fn install_blocking(signo: SigNum) -> Result<()> {
    if !is_valid(signo) {
        return Err(Error::InvalidSignal(signo));
    }
    block(signo)?;
    if !is_uncatchable(signo) {
        install_direct(signo, SigHandler::Handler(empty_handler))?;
    }
    Ok(())
}

pub fn block(signo: SigNum) -> Result<()> {
    let set = RawSigSet::of(signo).map_err(|_| Error::InvalidSignal(signo))?;
    thread_mask(libc::SIG_BLOCK, &set).map_err(Error::sys("pthread_sigmask"))
}

pub fn unblock(signo: SigNum) -> Result<()> {
    let set = RawSigSet::of(signo).map_err(|_| Error::InvalidSignal(signo))?;
    thread_mask(libc::SIG_UNBLOCK, &set).map_err(Error::sys("pthread_sigmask"))
}

/// `install_direct` unless `signo` already has a disposition. Returns whether
/// anything was installed.
pub fn register_direct(registry: &SignalRegistry, signo: SigNum, handler: SigHandler)
    -> Result<bool>
{
    if registry.is_registered(signo) {
        return Ok(false);
    }
    install_direct(signo, handler)?;
    registry.mark_registered(signo);
    Ok(true)
}

/// `install_blocking` unless `signo` already has a disposition. Returns
/// whether anything was installed.
pub fn register_blocking(registry: &SignalRegistry, signo: SigNum) -> Result<bool> {
    if registry.is_registered(signo) {
        return Ok(false);
    }
    install_blocking(signo)?;
    registry.mark_registered(signo);
    Ok(true)
}
