use std::process;

use thiserror::Error;

use crate::exit::ExitCode;
use crate::SigNum;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid signals set: {0}")]
    InvalidSignalSet(String),
    #[error("signal number {0} is out of range")]
    InvalidSignal(SigNum),
    #[error("disposition of signal {0} cannot be changed")]
    Uncatchable(SigNum),
    #[error("{call} failed: {source}")]
    Sys {
        call: &'static str,
        #[source]
        source: nix::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn sys(call: &'static str) -> impl FnOnce(nix::Error) -> Error {
        move |source| Error::Sys { call, source }
    }
}

/// Reports an error that leaves the process without its safety contract and
/// terminates it. Must not be called from a signal handler.
pub(crate) fn fatal(err: Error) -> ! {
    error!("{}", err);
    process::exit(ExitCode::Error.code())
}

/// Unwraps `res` or terminates the process through `fatal`
pub(crate) fn or_fatal<T>(res: Result<T>) -> T {
    match res {
        Ok(val) => val,
        Err(e) => fatal(e),
    }
}
