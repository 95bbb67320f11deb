extern crate env_logger;
extern crate libc;
extern crate signal_lifecycle;

use std::thread::sleep;
use std::time::Duration;

use signal_lifecycle::{init_daemon, is_hardware_fault, set_default_should_register_signals};
use signal_lifecycle::{ExitCode, SigNum};

fn signal_handler(signo: SigNum) {
    // faults go on to recovery, anything else ends the daemon
    if !is_hardware_fault(signo) {
        unsafe { libc::_exit(ExitCode::Ok.code()) }
    }
}

fn fail_handler() {
    // the crash image is in a forked child by now, nothing left to save
}

fn main() {
    env_logger::init();
    set_default_should_register_signals();
    init_daemon(None, Some(signal_handler), Some(fail_handler));
    sleep(Duration::from_secs(30));
}
