//! Which signals the process wants handled and which ones already have a
//! disposition installed
//!
//! Both tables are plain atomic flags indexed by signal number, so lookups
//! are safe from a signal handler.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Error, Result};
use crate::{SigNum, MAX_SIGNAL};

const TABLE_SIZE: usize = MAX_SIGNAL as usize;

/// Signals handled by `set_default_should_register_signals`
pub const DEFAULT_SIGNALS: [SigNum; 10] = [
    libc::SIGTERM,
    libc::SIGINT,
    libc::SIGQUIT,
    libc::SIGABRT,
    libc::SIGSEGV,
    libc::SIGFPE,
    libc::SIGXCPU,
    libc::SIGXFSZ,
    libc::SIGUSR1,
    libc::SIGUSR2,
];

/// Whether `signo` is within `1 .. MAX_SIGNAL`
pub fn is_valid(signo: SigNum) -> bool {
    signo > 0 && signo < MAX_SIGNAL
}

pub struct SignalRegistry {
    should_register: [AtomicBool; TABLE_SIZE],
    registered: [AtomicBool; TABLE_SIZE],
}

impl SignalRegistry {
    pub const fn new() -> SignalRegistry {
        SignalRegistry {
            should_register: [const { AtomicBool::new(false) }; TABLE_SIZE],
            registered: [const { AtomicBool::new(false) }; TABLE_SIZE],
        }
    }

    /// Replaces the should-register set and forgets every installed
    /// disposition. The set is validated as a whole before anything changes.
    pub fn set_should_register(&self, signals: &[SigNum]) -> Result<()> {
        if signals.is_empty() {
            return Err(Error::InvalidSignalSet("no signals given".into()));
        }
        if signals.len() >= TABLE_SIZE {
            return Err(Error::InvalidSignalSet(format!(
                "{} signals given, at most {} are possible",
                signals.len(),
                TABLE_SIZE - 1
            )));
        }
        if let Some(&bad) = signals.iter().find(|&&sig| !is_valid(sig)) {
            return Err(Error::InvalidSignalSet(format!(
                "signal number {} is out of range",
                bad
            )));
        }
        for idx in 0..TABLE_SIZE {
            self.should_register[idx].store(false, Ordering::SeqCst);
            self.registered[idx].store(false, Ordering::SeqCst);
        }
        for &sig in signals {
            self.should_register[sig as usize].store(true, Ordering::SeqCst);
        }
        Ok(())
    }

    pub fn set_default(&self) {
        // DEFAULT_SIGNALS is always a valid set
        let _ = self.set_should_register(&DEFAULT_SIGNALS);
    }

    pub fn is_should_register(&self, signo: SigNum) -> bool {
        is_valid(signo) && self.should_register[signo as usize].load(Ordering::SeqCst)
    }

    pub fn is_registered(&self, signo: SigNum) -> bool {
        is_valid(signo) && self.registered[signo as usize].load(Ordering::SeqCst)
    }

    /// Records that a disposition for `signo` has been installed. Only call
    /// this after the OS accepted it.
    pub fn mark_registered(&self, signo: SigNum) {
        if is_valid(signo) {
            self.registered[signo as usize].store(true, Ordering::SeqCst);
        }
    }

    /// Should-register signals in ascending order
    pub fn should_register(&self) -> impl Iterator<Item = SigNum> + '_ {
        (1..MAX_SIGNAL).filter(move |&sig| self.is_should_register(sig))
    }
}

impl Default for SignalRegistry {
    fn default() -> SignalRegistry {
        SignalRegistry::new()
    }
}
