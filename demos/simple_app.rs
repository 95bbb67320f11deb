extern crate env_logger;
extern crate libc;
extern crate signal_lifecycle;

use std::thread::sleep;
use std::time::Duration;

use signal_lifecycle::{init_foreground, set_should_register_signals, ExitCode, SigNum};

fn say(text: &str) {
    // println! is not allowed inside an asynchronous handler
    unsafe {
        libc::write(libc::STDERR_FILENO, text.as_ptr() as *const libc::c_void, text.len());
    }
}

fn signal_handler(signo: SigNum) {
    match signo {
        libc::SIGTERM => unsafe { libc::_exit(ExitCode::Ok.code()) },
        libc::SIGINT => say("Only SIGTERM stops this application\n"),
        _ => say("Got a signal\n"),
    }
}

fn exit_handler() {
    println!("Exiting");
}

fn main() {
    env_logger::init();
    set_should_register_signals(&[libc::SIGINT, libc::SIGTERM, libc::SIGUSR1,
                                  libc::SIGUSR2, libc::SIGFPE])
        .unwrap();
    init_foreground(Some(exit_handler), Some(signal_handler), None, false);

    for left in (0..60).rev() {
        println!("Left {}", left);
        sleep(Duration::from_secs(1));
    }
    println!("Stopping application");
}
