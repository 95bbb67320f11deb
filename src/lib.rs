//! Process lifecycle control for long-running unix services
//!
//! The library owns signal dispositions, daemonization and recovery from
//! hardware faults, so application code never touches raw signal APIs.
//!
//! There are two models for handling signals:
//!
//! 1. Single-threaded processes (`init_foreground`, `init_daemon`) get every
//!    configured signal delivered asynchronously to a handler, so the
//!    callbacks must be async-signal-safe
//! 2. Multi-threaded processes (`init_multithread_foreground`,
//!    `init_multithread_daemon`) only keep hardware faults asynchronous.
//!    Everything else is blocked in all threads and dequeued by one dedicated
//!    thread calling `wait_for_signal` in a loop, where the callback runs as
//!    ordinary code
//!
//! Hardware faults (`SIGSEGV`, `SIGFPE`, `SIGABRT`, ...) never silently
//! continue. With a fail callback configured, the process forks on the first
//! fault: the child aborts and leaves the crash dump, the parent runs the fail
//! callback and exits with a fault code.
//!
//! Typical single-threaded use:
//!
//! ```no_run
//! use signal_lifecycle::{init_foreground, set_default_should_register_signals};
//!
//! set_default_should_register_signals();
//! init_foreground(None, None, None, false);
//! ```
//!
//! The library is tested on linux only.

extern crate libc;
#[macro_use]
extern crate log;
extern crate nix;
extern crate thiserror;

mod callbacks;
mod daemon;
mod error;
mod exit;
mod ffi;
mod install;
mod lifecycle;
mod registry;
mod trap;
pub mod fault;
pub mod recovery;

pub use callbacks::{CallbackSlots, Callbacks, ExitCallback, FailCallback, SignalCallback};
pub use error::{Error, Result};
pub use exit::{ExitCode, FAULT_EXIT_BASE};
pub use fault::{is_hardware_fault, is_uncatchable};
pub use install::{alternate_stack_size, ALT_STACK_SIZE};
pub use lifecycle::{context, Context, LifecycleMode};
pub use lifecycle::{init_daemon, init_foreground};
pub use lifecycle::{init_multithread_daemon, init_multithread_foreground};
pub use registry::{SignalRegistry, DEFAULT_SIGNALS};
pub use trap::Waiter;

/// Raw signal number
pub type SigNum = libc::c_int;

/// One past the highest signal number of the platform
#[cfg(any(target_os = "linux", target_os = "android"))]
pub const MAX_SIGNAL: SigNum = 65;
#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub const MAX_SIGNAL: SigNum = 32;

/// Replaces the set of signals the library takes over. Fails without
/// changing anything when the set is empty or has an out-of-range number.
pub fn set_should_register_signals(signals: &[SigNum]) -> Result<()> {
    context().set_should_register_signals(signals)
}

/// Takes over `DEFAULT_SIGNALS`: termination, interrupt, quit, abort,
/// segmentation fault, floating point exception, resource limits and the two
/// user-defined signals
pub fn set_default_should_register_signals() {
    context().set_default_should_register_signals()
}

/// See `Context::wait_for_signal`
pub fn wait_for_signal(callback: SignalCallback) {
    context().wait_for_signal(callback)
}

/// Blocks `signo` process-wide unless the library already handles it
pub fn lock_signal(signo: SigNum) -> Result<()> {
    context().lock_signal(signo)
}

/// Unblocks `signo`, dropping an instance queued while it was locked
pub fn unlock_signal(signo: SigNum) -> Result<()> {
    context().unlock_signal(signo)
}

/// Aborts the process for an application-detected fatal error, without the
/// abort being intercepted by the library's own handler
pub fn safe_abort() -> ! {
    context().safe_abort()
}
