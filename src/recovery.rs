//! Fault handling state machine
//!
//! ```text
//! Uninitialized -> Arming -> Armed -> InFault -> Recovered -> Terminated
//!                                            \-> Terminated
//! ```
//!
//! When the application supplies a fail callback, arming records a
//! checkpoint. On the first hardware fault the signal callback runs, then the
//! process forks: the child aborts with the default disposition and leaves a
//! regular crash dump behind, while the parent resumes at the checkpoint, runs
//! the fail callback and exits through the controlled abort path. Without a
//! checkpoint, or when fork fails, the fault goes straight to controlled
//! abort. So does a fault with no signal callback configured: the default
//! strategy never recovers.
//!
//! A second fault while the first one is being handled always aborts, except
//! for one extra `SIGABRT`, which libc's `abort` raises again by itself.
//!
//! Everything reachable from `on_signal` is restricted to atomics and the
//! primitives in `ffi`.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use nix::sys::signal::Signal;

use crate::callbacks::CallbackSlots;
use crate::exit::ExitCode;
use crate::fault::is_hardware_fault;
use crate::ffi;
use crate::SigNum;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecoveryState {
    Uninitialized = 0,
    Arming = 1,
    Armed = 2,
    InFault = 3,
    Recovered = 4,
    Terminated = 5,
}

impl RecoveryState {
    fn from_raw(raw: u8) -> RecoveryState {
        match raw {
            1 => RecoveryState::Arming,
            2 => RecoveryState::Armed,
            3 => RecoveryState::InFault,
            4 => RecoveryState::Recovered,
            5 => RecoveryState::Terminated,
            _ => RecoveryState::Uninitialized,
        }
    }
}

/// The two ways execution passes through the checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    /// Normal execution, the checkpoint becomes usable
    Armed,
    /// Re-entered from the fault handler after the crash image was forked off
    ResumedAfterFault,
}

pub struct RecoveryEngine {
    state: AtomicU8,
    initialized: AtomicBool,
    checkpoint: AtomicBool,
    in_fault: AtomicBool,
    abort_tolerated: AtomicBool,
    core_creation: AtomicBool,
}

impl RecoveryEngine {
    pub const fn new() -> RecoveryEngine {
        RecoveryEngine {
            state: AtomicU8::new(RecoveryState::Uninitialized as u8),
            initialized: AtomicBool::new(false),
            checkpoint: AtomicBool::new(false),
            in_fault: AtomicBool::new(false),
            abort_tolerated: AtomicBool::new(false),
            core_creation: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> RecoveryState {
        RecoveryState::from_raw(self.state.load(Ordering::SeqCst))
    }

    fn set_state(&self, state: RecoveryState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    /// Whether handlers may run callbacks
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn has_checkpoint(&self) -> bool {
        self.checkpoint.load(Ordering::SeqCst)
    }

    /// Stops callbacks from running until the next `mark_initialized`
    pub fn suspend(&self) {
        self.initialized.store(false, Ordering::SeqCst);
    }

    pub fn begin_arming(&self) {
        self.suspend();
        self.set_state(RecoveryState::Arming);
    }

    /// Records the checkpoint if a fail callback is configured
    pub fn arm(&self, slots: &CallbackSlots) {
        if slots.fail().is_some() {
            self.enter(Checkpoint::Armed, slots);
        } else {
            self.checkpoint.store(false, Ordering::SeqCst);
        }
    }

    pub fn mark_initialized(&self) {
        self.set_state(RecoveryState::Armed);
        self.initialized.store(true, Ordering::SeqCst);
    }

    /// Passes through the checkpoint. The resumed branch runs the fail
    /// callback and never returns.
    pub fn enter(&self, checkpoint: Checkpoint, slots: &CallbackSlots) {
        match checkpoint {
            Checkpoint::Armed => {
                self.checkpoint.store(true, Ordering::SeqCst);
            }
            Checkpoint::ResumedAfterFault => {
                self.set_state(RecoveryState::Recovered);
                if let Some(callback) = slots.fail() {
                    callback();
                }
                self.controlled_abort();
            }
        }
    }

    /// Entry point of the installed handler
    pub fn on_signal(&self, signo: SigNum, slots: &CallbackSlots) {
        if !self.is_initialized() {
            return;
        }
        let fault = is_hardware_fault(signo);
        if fault {
            if self.in_fault.swap(true, Ordering::SeqCst) {
                if signo != libc::SIGABRT || self.abort_tolerated.swap(true, Ordering::SeqCst) {
                    self.controlled_abort();
                }
                return;
            }
            self.set_state(RecoveryState::InFault);
        }

        match slots.signal() {
            Some(callback) => callback(signo),
            None => self.default_strategy(signo),
        }

        if fault {
            if self.has_checkpoint() && ffi::fork() > 0 {
                self.core_creation.store(true, Ordering::SeqCst);
                self.enter(Checkpoint::ResumedAfterFault, slots);
            }
            // the forked child, or no checkpoint, or fork failed
            self.controlled_abort();
        }
    }

    /// Used when no signal callback is configured. Ordinary signals end the
    /// process with success, faults abort without recovery.
    fn default_strategy(&self, signo: SigNum) {
        if is_hardware_fault(signo) {
            self.controlled_abort();
        }
        ffi::exit_now(ExitCode::Ok.code());
    }

    /// Aborts with the default `SIGABRT` disposition, so the abort is not
    /// intercepted again and the OS produces its usual crash dump. While a
    /// crash image is being forked off, exits immediately with a fault code
    /// instead.
    pub fn controlled_abort(&self) -> ! {
        self.set_state(RecoveryState::Terminated);
        if self.core_creation.load(Ordering::SeqCst) {
            ffi::exit_now(ExitCode::fault(libc::SIGABRT));
        }
        ffi::reset_abort();
        ffi::raise(Signal::SIGABRT);
        // still here if SIGABRT is blocked, abort unblocks it
        ffi::abort()
    }
}

impl Default for RecoveryEngine {
    fn default() -> RecoveryEngine {
        RecoveryEngine::new()
    }
}
