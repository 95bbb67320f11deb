//! Application callbacks and the process-wide slots they live in
//!
//! Callbacks given to an asynchronous mode run inside a signal handler. They
//! must restrict themselves to async-signal-safe work (atomics, `write(2)`,
//! `_exit`). The callback given to `wait_for_signal` runs as ordinary code.

use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::SigNum;

/// Runs when the process terminates normally
pub type ExitCallback = fn();
/// Receives the number of the signal that triggered it
pub type SignalCallback = fn(SigNum);
/// Runs once after a hardware fault, in the process that keeps going after
/// the crash image has been forked off
pub type FailCallback = fn();

/// The strategies chosen at initialization. Every slot is optional; an empty
/// signal slot selects the default strategy (exit with success on ordinary
/// signals, controlled abort on faults).
#[derive(Debug, Clone, Copy, Default)]
pub struct Callbacks {
    exit: Option<ExitCallback>,
    signal: Option<SignalCallback>,
    fail: Option<FailCallback>,
}

impl Callbacks {
    pub fn new() -> Callbacks {
        Callbacks::default()
    }

    pub fn from_options(exit: Option<ExitCallback>, signal: Option<SignalCallback>,
                        fail: Option<FailCallback>)
        -> Callbacks
    {
        Callbacks { exit, signal, fail }
    }

    pub fn on_exit(mut self, callback: ExitCallback) -> Callbacks {
        self.exit = Some(callback);
        self
    }

    pub fn on_signal(mut self, callback: SignalCallback) -> Callbacks {
        self.signal = Some(callback);
        self
    }

    /// Opts into fork-based recovery from hardware faults
    pub fn on_fail(mut self, callback: FailCallback) -> Callbacks {
        self.fail = Some(callback);
        self
    }

    pub fn exit(&self) -> Option<ExitCallback> {
        self.exit
    }

    pub fn signal(&self) -> Option<SignalCallback> {
        self.signal
    }

    pub fn fail(&self) -> Option<FailCallback> {
        self.fail
    }
}

/// Function pointers stored as words, zero meaning "unset", so a signal
/// handler can read them without locking.
pub struct CallbackSlots {
    exit: AtomicUsize,
    signal: AtomicUsize,
    fail: AtomicUsize,
}

impl CallbackSlots {
    pub const fn new() -> CallbackSlots {
        CallbackSlots {
            exit: AtomicUsize::new(0),
            signal: AtomicUsize::new(0),
            fail: AtomicUsize::new(0),
        }
    }

    pub fn store(&self, callbacks: &Callbacks) {
        self.exit.store(callbacks.exit.map_or(0, |f| f as usize), Ordering::SeqCst);
        self.signal.store(callbacks.signal.map_or(0, |f| f as usize), Ordering::SeqCst);
        self.fail.store(callbacks.fail.map_or(0, |f| f as usize), Ordering::SeqCst);
    }

    pub fn exit(&self) -> Option<ExitCallback> {
        match self.exit.load(Ordering::SeqCst) {
            0 => None,
            raw => Some(unsafe { mem::transmute::<usize, ExitCallback>(raw) }),
        }
    }

    pub fn signal(&self) -> Option<SignalCallback> {
        match self.signal.load(Ordering::SeqCst) {
            0 => None,
            raw => Some(unsafe { mem::transmute::<usize, SignalCallback>(raw) }),
        }
    }

    pub fn fail(&self) -> Option<FailCallback> {
        match self.fail.load(Ordering::SeqCst) {
            0 => None,
            raw => Some(unsafe { mem::transmute::<usize, FailCallback>(raw) }),
        }
    }
}

impl Default for CallbackSlots {
    fn default() -> CallbackSlots {
        CallbackSlots::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicI32;

    static SEEN: AtomicI32 = AtomicI32::new(0);

    fn remember(signo: SigNum) {
        SEEN.store(signo, Ordering::SeqCst);
    }

    fn nothing() {}

    #[test]
    fn empty_slots() {
        let slots = CallbackSlots::new();
        slots.store(&Callbacks::new());
        assert!(slots.exit().is_none());
        assert!(slots.signal().is_none());
        assert!(slots.fail().is_none());
    }

    #[test]
    fn stored_callback_is_callable() {
        let slots = CallbackSlots::new();
        slots.store(&Callbacks::new().on_signal(remember).on_fail(nothing));
        let cb = slots.signal().expect("signal callback stored");
        cb(libc::SIGUSR2);
        assert_eq!(SEEN.load(Ordering::SeqCst), libc::SIGUSR2);
        assert!(slots.fail().is_some());
        assert!(slots.exit().is_none());
    }

    #[test]
    fn storing_replaces_everything() {
        let slots = CallbackSlots::new();
        slots.store(&Callbacks::new().on_exit(nothing).on_fail(nothing));
        slots.store(&Callbacks::new().on_signal(remember));
        assert!(slots.exit().is_none());
        assert!(slots.fail().is_none());
        assert!(slots.signal().is_some());
    }
}
