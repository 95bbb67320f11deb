//! Waiting for signals synchronously
//!
//! It works as follows:
//!
//! 1. A multi-threaded initialization blocks every non-fault signal of the
//!    should-register set, before any worker thread exists, so all threads
//!    inherit the mask
//! 2. One dedicated thread calls `wait_for_signal(callback)` in a loop (or
//!    iterates over a `Waiter`), dequeuing one signal at a time
//!
//! The callback runs on the waiting thread as ordinary code, not inside a
//! signal handler, so it may allocate, lock and do I/O. Hardware faults are
//! never waited for: they stay on the asynchronous path.
//!
//! There is no timeout and no cancellation, the wait only ends when a signal
//! arrives.

use crate::callbacks::SignalCallback;
use crate::error::{or_fatal, Error};
use crate::fault::is_hardware_fault;
use crate::ffi::{sigwait, RawSigSet};
use crate::registry::SignalRegistry;
use crate::SigNum;

/// The set of signals a waiter dequeues, snapshotted from the registry
pub struct Waiter {
    sigset: RawSigSet,
}

impl Waiter {
    /// Waits for every should-register signal that is not a hardware fault
    pub fn new(registry: &SignalRegistry) -> Waiter {
        let mut sigset = RawSigSet::empty();
        for sig in registry.should_register() {
            if !is_hardware_fault(sig) {
                // numbers in the registry are always in range
                let _ = sigset.add(sig);
            }
        }
        Waiter { sigset }
    }

    pub fn contains(&self, signo: SigNum) -> bool {
        self.sigset.contains(signo)
    }

    /// Blocks until one of the signals is pending and dequeues it. Failing
    /// to wait terminates the process.
    pub fn wait(&self) -> SigNum {
        or_fatal(sigwait(&self.sigset).map_err(Error::sys("sigwait")))
    }
}

impl Iterator for Waiter {
    type Item = SigNum;
    fn next(&mut self) -> Option<SigNum> {
        Some(self.wait())
    }
}

/// Waits for one signal and hands it to `callback` on the calling thread
pub fn wait_for_signal(registry: &SignalRegistry, callback: SignalCallback) {
    let sig = Waiter::new(registry).wait();
    debug!("Dequeued signal {}", sig);
    callback(sig);
}
