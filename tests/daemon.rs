extern crate libc;
extern crate nix;
extern crate serial_test;
extern crate signal_lifecycle;
extern crate tempfile;

mod common;

use std::fs;
use std::os::unix::fs::MetadataExt;
use std::os::unix::io::RawFd;
use std::path::Path;
use std::thread::sleep;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::fcntl::{open, OFlag};
use nix::sys::stat::{fstat, umask, Mode};
use nix::unistd::{getpgid, getpid, getsid, Pid};
use serial_test::serial;

use signal_lifecycle::{context, init_daemon, set_should_register_signals};

use common::{exit_code, in_child};

fn hangup_ignored() -> bool {
    unsafe {
        let mut old: libc::sigaction = std::mem::zeroed();
        libc::sigaction(libc::SIGHUP, std::ptr::null(), &mut old) == 0
            && old.sa_sigaction == libc::SIG_IGN
    }
}

/// What the daemon observes about itself, one flag per line
fn observe(parent_session: Pid, inherited: RawFd) -> String {
    let null = fs::metadata("/dev/null").map(|m| m.rdev()).unwrap_or(u64::MAX);
    let streams = (0..3).all(|fd| {
        fstat(fd).map(|st| st.st_rdev as u64 == null).unwrap_or(false)
    });
    // the second fork leaves the daemon in a new session it does not lead
    let detached = match (getsid(None), getpgid(None)) {
        (Ok(sid), Ok(group)) => sid == group && sid != getpid() && sid != parent_session,
        _ => false,
    };
    let checks = [
        ("inherited_closed", matches!(fstat(inherited), Err(Errno::EBADF))),
        ("session_detached", detached),
        ("no_terminal", matches!(open("/dev/tty", OFlag::O_RDWR, Mode::empty()),
                                 Err(Errno::ENXIO) | Err(Errno::ENOENT))),
        ("root_dir", std::env::current_dir().map(|d| d == Path::new("/")).unwrap_or(false)),
        ("null_streams", streams),
        ("hangup_ignored", hangup_ignored()),
        ("hangup_registered", context().registry().is_registered(libc::SIGHUP)),
        ("umask_cleared", umask(Mode::empty()).is_empty()),
    ];
    checks.iter().map(|(name, ok)| format!("{} {}\n", name, ok)).collect()
}

#[test]
#[serial]
fn daemon_detaches() {
    let dir = tempfile::tempdir().unwrap();
    let report = dir.path().join("report");
    let target = report.clone();
    let parent_session = getsid(None).unwrap();
    let status = in_child(move || {
        let inherited = match open("/dev/null", OFlag::O_RDONLY, Mode::empty()) {
            Ok(fd) => fd,
            Err(_) => return 2,
        };
        set_should_register_signals(&[libc::SIGTERM, libc::SIGUSR1]).unwrap();
        init_daemon(None, None, None);
        // only the daemon itself gets here
        let partial = target.with_extension("tmp");
        if fs::write(&partial, observe(parent_session, inherited)).is_err() || fs::rename(&partial, &target).is_err() {
            return 1;
        }
        0
    });
    // the first fork's parent leaves with success
    assert_eq!(exit_code(status), Some(0));

    let deadline = Instant::now() + Duration::from_secs(10);
    while !report.exists() && Instant::now() < deadline {
        sleep(Duration::from_millis(20));
    }
    let text = fs::read_to_string(&report).expect("daemon report");
    for line in text.lines() {
        assert!(line.ends_with(" true"), "{}", text);
    }
    assert_eq!(text.lines().count(), 8);
}
