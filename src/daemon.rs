//! Detaching the process from its terminal
//!
//! The classic sequence: fork and let the parent go, become a session
//! leader, ignore `SIGHUP`, fork again so the session can never reacquire a
//! controlling terminal, then drop inherited descriptors, point the standard
//! streams at `/dev/null`, move to `/` and clear the umask. Only the second
//! child returns from `daemonize`.
//!
//! Must run before any other thread is started: `fork` only carries the
//! calling thread over.

use std::os::unix::io::RawFd;
use std::process;

use nix::fcntl::{open, OFlag};
use nix::sys::signal::SigHandler;
use nix::sys::stat::{umask, Mode};
use nix::unistd::{chdir, close, dup2, fork, setsid, sysconf, ForkResult, SysconfVar};

use crate::error::{Error, Result};
use crate::exit::ExitCode;
use crate::install::register_direct;
use crate::registry::SignalRegistry;

/// Used when the descriptor limit can't be queried
const FALLBACK_MAX_FD: RawFd = 64;
/// Upper bound for closing descriptors one by one, open file limits in
/// containers can be huge
const MAX_FD_SCAN: RawFd = 65536;

fn fork_and_leave_parent() -> Result<()> {
    match unsafe { fork() }.map_err(Error::sys("fork"))? {
        ForkResult::Parent { .. } => process::exit(ExitCode::Ok.code()),
        ForkResult::Child => Ok(()),
    }
}

fn max_fd() -> RawFd {
    match sysconf(SysconfVar::OPEN_MAX) {
        Ok(Some(limit)) if limit > 0 => limit.min(MAX_FD_SCAN as libc::c_long) as RawFd,
        _ => FALLBACK_MAX_FD,
    }
}

#[cfg(target_os = "linux")]
fn close_range_from(first: RawFd) -> bool {
    let res = unsafe {
        libc::syscall(libc::SYS_close_range, first as libc::c_uint, libc::c_uint::MAX,
                      0 as libc::c_uint)
    };
    res == 0
}

#[cfg(not(target_os = "linux"))]
fn close_range_from(_first: RawFd) -> bool {
    false
}

fn close_inherited() {
    // kernels before 5.9 lack close_range
    if close_range_from(3) {
        return;
    }
    for fd in 3..max_fd() {
        // most of them are not open
        let _ = close(fd);
    }
}

fn redirect_std_streams() -> Result<()> {
    let null = open("/dev/null", OFlag::O_RDWR, Mode::empty()).map_err(Error::sys("open"))?;
    for fd in 0..3 {
        if fd != null {
            dup2(null, fd).map_err(Error::sys("dup2"))?;
        }
    }
    if null > 2 {
        close(null).map_err(Error::sys("close"))?;
    }
    Ok(())
}

/// Runs the daemonization sequence. `register_exit` is called once the
/// final process is known, to hook the exit callback.
pub fn daemonize<F>(registry: &SignalRegistry, register_exit: F) -> Result<()>
    where F: FnOnce() -> Result<()>
{
    info!("Going to background");
    fork_and_leave_parent()?;
    setsid().map_err(Error::sys("setsid"))?;
    register_direct(registry, libc::SIGHUP, SigHandler::SigIgn)?;
    fork_and_leave_parent()?;
    register_exit()?;
    close_inherited();
    redirect_std_streams()?;
    chdir("/").map_err(Error::sys("chdir"))?;
    umask(Mode::empty());
    Ok(())
}
