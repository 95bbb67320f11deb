//! Classification of signal numbers

use crate::SigNum;

/// Signals whose disposition the OS never lets us change
pub fn is_uncatchable(signo: SigNum) -> bool {
    matches!(signo, libc::SIGKILL | libc::SIGSTOP)
}

/// Signals reporting corrupted process state rather than an external request.
///
/// These stay on the asynchronous path in every mode and are the ones that
/// enter fault recovery.
pub fn is_hardware_fault(signo: SigNum) -> bool {
    matches!(
        signo,
        libc::SIGSEGV
            | libc::SIGBUS
            | libc::SIGILL
            | libc::SIGFPE
            | libc::SIGABRT
            | libc::SIGXCPU
            | libc::SIGXFSZ
    )
}
