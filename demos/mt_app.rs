extern crate env_logger;
extern crate libc;
extern crate signal_lifecycle;

use std::process::exit;
use std::thread::{self, sleep};
use std::time::Duration;

use signal_lifecycle::{init_multithread_foreground, set_should_register_signals};
use signal_lifecycle::{wait_for_signal, ExitCode, SigNum};

// Runs on the waiting thread, so regular code is fine here
fn signal_handler(signo: SigNum) {
    println!("Got signal {}", signo);
    if signo == libc::SIGTERM {
        exit(ExitCode::Ok.code());
    }
}

// Only ever sees hardware faults, runs inside the handler
fn fault_handler(_: SigNum) {
    let text = "Fault\n";
    unsafe {
        libc::write(libc::STDERR_FILENO, text.as_ptr() as *const libc::c_void, text.len());
    }
}

fn main() {
    env_logger::init();
    set_should_register_signals(&[libc::SIGINT, libc::SIGTERM, libc::SIGUSR1,
                                  libc::SIGUSR2, libc::SIGFPE])
        .unwrap();
    init_multithread_foreground(None, Some(fault_handler), None, true);

    thread::spawn(|| loop {
        wait_for_signal(signal_handler);
        println!("Waiting for the next signal");
    });

    let jobs = (0..3).map(|num| {
        thread::spawn(move || {
            for left in (0..60).rev() {
                println!("Job {} left {}", num, left);
                sleep(Duration::from_secs(1));
            }
        })
    }).collect::<Vec<_>>();
    for job in jobs {
        job.join().unwrap();
    }
    println!("Jobs are done");
}
