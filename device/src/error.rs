use std::{ffi::NulError, fmt, path::PathBuf};

use libc::c_int;
use nix::errno::Errno;
use thiserror::Error;

use cryptlog_shim::{LogStack, LOG_TARGET};

/// A failed libcryptsetup call together with everything it logged while running
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptError {
    errno: Errno,
    messages: Vec<String>,
}

impl CryptError {
    pub fn new(errno: Errno, messages: Vec<String>) -> Self {
        CryptError { errno, messages }
    }

    /// The errno the call returned, negated back to a positive value
    pub fn errno(&self) -> Errno {
        self.errno
    }

    /// Messages logged during the call, oldest first
    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

impl fmt::Display for CryptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.errno)?;
        let mut sep = ": ";
        for msg in &self.messages {
            let msg = msg.trim_end();
            if msg.is_empty() {
                continue;
            }
            write!(f, "{}{}", sep, msg)?;
            sep = " ";
        }
        Ok(())
    }
}

impl std::error::Error for CryptError {}

#[derive(Debug, Error)]
pub enum Error {
    #[error("libcryptsetup error: {0}")]
    Crypt(#[from] CryptError),
    #[error("Argument contains a NUL byte: {0}")]
    Nul(#[from] NulError),
    #[error("Path is not valid UTF-8: {0:?}")]
    InvalidPath(PathBuf),
    #[error("Invalid UUID reported by libcryptsetup: {0}")]
    InvalidUuid(#[from] uuid::Error),
    #[error("Unexpected value from libcryptsetup: {0}")]
    InvalidConversion(String),
}

impl Error {
    /// The native errno, if this error came from libcryptsetup
    pub fn errno(&self) -> Option<Errno> {
        match self {
            Error::Crypt(e) => Some(e.errno()),
            _ => None,
        }
    }
}

/// Turn a native status and the messages captured for it into a `Result`.
///
/// Negative statuses are `-errno`. On success the messages are not an error, so they
/// are passed on to the logger instead.
pub(crate) fn check(rc: c_int, ls: LogStack) -> Result<c_int, Error> {
    if rc < 0 {
        let errno = Errno::from_i32(rc.checked_neg().unwrap_or(c_int::MAX));
        return Err(CryptError::new(errno, ls.into_chronological()).into());
    }
    for msg in ls.into_chronological() {
        log::debug!(target: LOG_TARGET, "{}", msg.trim_end());
    }
    Ok(rc)
}
