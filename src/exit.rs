//! Exit codes surfaced to the operating system

use libc::c_int;

use crate::SigNum;

/// Offset added to a signal number when a fault ends the process through
/// `_exit` instead of through the signal's default action.
pub const FAULT_EXIT_BASE: c_int = 128;

/// Process exit codes used by the library itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Ok = 0,
    Error = 1,
    BadArgument = 2,
    BadResource = 3,
    BadPrivileges = 4,
}

impl ExitCode {
    pub fn code(self) -> c_int {
        self as c_int
    }

    /// Exit code of a process that terminated itself because of `signo`
    pub fn fault(signo: SigNum) -> c_int {
        FAULT_EXIT_BASE + signo
    }
}

impl From<ExitCode> for c_int {
    fn from(code: ExitCode) -> c_int {
        code.code()
    }
}
