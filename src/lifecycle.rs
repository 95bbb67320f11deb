//! Initialization entry points tying everything together
//!
//! All state lives in a single process-wide `Context`, mirroring the single
//! signal disposition table and signal mask the process has. Signal
//! dispositions and the alternate stack are never torn down; they go away
//! with the process.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use libc::{self, c_int};
use nix::errno::Errno;
use nix::sys::signal::SigHandler;

use crate::callbacks::{CallbackSlots, Callbacks, ExitCallback, FailCallback, SignalCallback};
use crate::daemon::daemonize;
use crate::error::{or_fatal, Error, Result};
use crate::fault::is_hardware_fault;
use crate::ffi::{pending, sigwait, RawSigSet};
use crate::install::{block, register_blocking, register_direct, unblock};
use crate::recovery::RecoveryEngine;
use crate::registry::{is_valid, SignalRegistry};
use crate::trap;
use crate::SigNum;

/// How the process runs, chosen once at initialization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LifecycleMode {
    /// Single thread, every signal handled asynchronously
    Foreground = 1,
    /// `Foreground` after daemonization
    Daemon = 2,
    /// Faults handled asynchronously, everything else waited for by a
    /// dedicated thread
    MultiThread = 3,
    /// `MultiThread` after daemonization
    MultiThreadDaemon = 4,
}

impl LifecycleMode {
    pub fn is_daemon(self) -> bool {
        matches!(self, LifecycleMode::Daemon | LifecycleMode::MultiThreadDaemon)
    }

    pub fn is_multithread(self) -> bool {
        matches!(self, LifecycleMode::MultiThread | LifecycleMode::MultiThreadDaemon)
    }

    fn from_raw(raw: u8) -> Option<LifecycleMode> {
        match raw {
            1 => Some(LifecycleMode::Foreground),
            2 => Some(LifecycleMode::Daemon),
            3 => Some(LifecycleMode::MultiThread),
            4 => Some(LifecycleMode::MultiThreadDaemon),
            _ => None,
        }
    }
}

/// The process-wide signal handling state. Exactly one exists, see
/// `context()`.
pub struct Context {
    registry: SignalRegistry,
    callbacks: CallbackSlots,
    recovery: RecoveryEngine,
    mode: AtomicU8,
    exit_hooked: AtomicBool,
}

static CONTEXT: Context = Context::new();

pub fn context() -> &'static Context {
    &CONTEXT
}

extern "C" fn handle_signal(signo: c_int) {
    let ctx = context();
    ctx.recovery.on_signal(signo, &ctx.callbacks);
}

extern "C" fn run_exit_callback() {
    if let Some(callback) = context().callbacks.exit() {
        callback();
    }
}

impl Context {
    const fn new() -> Context {
        Context {
            registry: SignalRegistry::new(),
            callbacks: CallbackSlots::new(),
            recovery: RecoveryEngine::new(),
            mode: AtomicU8::new(0),
            exit_hooked: AtomicBool::new(false),
        }
    }

    pub fn registry(&self) -> &SignalRegistry {
        &self.registry
    }

    pub fn recovery(&self) -> &RecoveryEngine {
        &self.recovery
    }

    /// Mode of the last initialization, if any
    pub fn mode(&self) -> Option<LifecycleMode> {
        LifecycleMode::from_raw(self.mode.load(Ordering::SeqCst))
    }

    pub fn set_should_register_signals(&self, signals: &[SigNum]) -> Result<()> {
        self.registry.set_should_register(signals)?;
        self.recovery.suspend();
        Ok(())
    }

    pub fn set_default_should_register_signals(&self) {
        self.registry.set_default();
        self.recovery.suspend();
    }

    /// Takes over the should-register signals as `mode` prescribes. Any OS
    /// failure on the way terminates the process.
    ///
    /// In multi-threaded modes this must run before other threads are
    /// spawned, so they inherit the signal mask.
    pub fn init(&self, mode: LifecycleMode, callbacks: Callbacks, lock_io: bool) {
        info!("Initializing signal handling, mode {:?}", mode);
        self.mode.store(mode as u8, Ordering::SeqCst);
        self.recovery.begin_arming();
        self.callbacks.store(&callbacks);

        if mode.is_daemon() {
            or_fatal(daemonize(&self.registry, || self.hook_exit()));
        } else {
            or_fatal(self.hook_exit());
        }
        if mode.is_multithread() {
            or_fatal(self.block_requests());
        }
        or_fatal(self.install_handlers(mode.is_multithread(), lock_io || mode.is_daemon()));

        self.recovery.arm(&self.callbacks);
        self.recovery.mark_initialized();
        debug!("Signal handling ready, recovery checkpoint: {}",
               self.recovery.has_checkpoint());
    }

    fn hook_exit(&self) -> Result<()> {
        if self.callbacks.exit().is_none() || self.exit_hooked.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if unsafe { libc::atexit(run_exit_callback) } != 0 {
            return Err(Error::sys("atexit")(Errno::ENOMEM));
        }
        Ok(())
    }

    /// Queues every non-fault signal for the waiter thread
    fn block_requests(&self) -> Result<()> {
        for sig in self.registry.should_register() {
            if !is_hardware_fault(sig) && register_blocking(&self.registry, sig)? {
                debug!("Signal {} blocked for synchronous handling", sig);
            }
        }
        Ok(())
    }

    fn install_handlers(&self, faults_only: bool, lock_io: bool) -> Result<()> {
        if lock_io {
            // silent processes must not die writing to a closed stream
            self.lock_signal(libc::SIGPIPE)?;
        }
        for sig in self.registry.should_register() {
            if faults_only && !is_hardware_fault(sig) {
                continue;
            }
            if register_direct(&self.registry, sig, SigHandler::Handler(handle_signal))? {
                debug!("Signal {} handled asynchronously", sig);
            }
        }
        Ok(())
    }

    /// Waits for one non-fault signal and runs `callback` with it on the
    /// calling thread. Meant for the one dedicated signal thread of a
    /// multi-threaded process, called in a loop.
    pub fn wait_for_signal(&self, callback: SignalCallback) {
        if !self.mode().map_or(false, LifecycleMode::is_multithread) {
            warn!("Waiting for signals outside of multi-threaded mode");
        }
        trap::wait_for_signal(&self.registry, callback);
    }

    /// Blocks `signo` unless a disposition for it is already installed
    pub fn lock_signal(&self, signo: SigNum) -> Result<()> {
        if !is_valid(signo) {
            return Err(Error::InvalidSignal(signo));
        }
        if !self.registry.is_registered(signo) {
            or_fatal(block(signo));
            debug!("Signal {} locked", signo);
        }
        Ok(())
    }

    /// Reverts `lock_signal`. An instance of `signo` queued meanwhile is
    /// dropped rather than delivered.
    pub fn unlock_signal(&self, signo: SigNum) -> Result<()> {
        if !is_valid(signo) {
            return Err(Error::InvalidSignal(signo));
        }
        if self.registry.is_registered(signo) {
            return Ok(());
        }
        let queued = or_fatal(pending().map_err(Error::sys("sigpending")));
        if queued.contains(signo) {
            let only = RawSigSet::of(signo).map_err(|_| Error::InvalidSignal(signo))?;
            or_fatal(sigwait(&only).map_err(Error::sys("sigwait")));
            debug!("Dropped queued signal {}", signo);
        }
        or_fatal(unblock(signo));
        debug!("Signal {} unlocked", signo);
        Ok(())
    }

    /// Terminates through the same controlled abort used for faults
    pub fn safe_abort(&self) -> ! {
        self.recovery.controlled_abort()
    }
}

/// Single-threaded process staying in the foreground. `lock_io` blocks
/// `SIGPIPE` for processes whose output may go nowhere.
pub fn init_foreground(exit: Option<ExitCallback>, signal: Option<SignalCallback>,
                       fail: Option<FailCallback>, lock_io: bool)
{
    context().init(LifecycleMode::Foreground,
                   Callbacks::from_options(exit, signal, fail), lock_io);
}

/// Single-threaded process going to background
pub fn init_daemon(exit: Option<ExitCallback>, signal: Option<SignalCallback>,
                   fail: Option<FailCallback>)
{
    context().init(LifecycleMode::Daemon,
                   Callbacks::from_options(exit, signal, fail), true);
}

/// Multi-threaded process staying in the foreground. `signal` only ever
/// sees hardware faults; other signals go to `wait_for_signal`.
pub fn init_multithread_foreground(exit: Option<ExitCallback>, signal: Option<SignalCallback>,
                                   fail: Option<FailCallback>, lock_io: bool)
{
    context().init(LifecycleMode::MultiThread,
                   Callbacks::from_options(exit, signal, fail), lock_io);
}

/// Multi-threaded process going to background
pub fn init_multithread_daemon(exit: Option<ExitCallback>, signal: Option<SignalCallback>,
                               fail: Option<FailCallback>)
{
    context().init(LifecycleMode::MultiThreadDaemon,
                   Callbacks::from_options(exit, signal, fail), true);
}
