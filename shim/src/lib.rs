//! Capture what libcryptsetup logs during a single call.
//!
//! libcryptsetup reports the details of a failure (a device that is too small, a
//! passphrase that matched no keyslot) through a logging callback rather than through its
//! return codes. This crate wraps each entry point so that, for the duration of one call,
//! that callback writes into a [`LogStack`] owned by the caller. Afterwards the callback is
//! pointed back at [`default_sink`], which forwards to the `log` crate.
//!
//! ```no_run
//! use std::ptr;
//! use cryptlog_shim::{calls, LogStack};
//!
//! let mut cd: *mut cryptlog_shim::sys::crypt_device = ptr::null_mut();
//! let mut ls = LogStack::new();
//! let rc = unsafe { calls::crypt_init(&mut ls, &mut cd, c"/dev/sdb".as_ptr()) };
//! assert!(rc >= 0);
//!
//! let mut ls = LogStack::new();
//! let rc = unsafe { cryptlog_shim::format_luks(&mut ls, cd) };
//! if rc < 0 {
//!     for message in &ls {
//!         eprintln!("{}", message.to_string_lossy());
//!     }
//! }
//! ```

pub use libcryptsetup_rs_sys as sys;

#[macro_use]
mod macros;

pub mod calls;
mod format_luks;
pub mod instrument;
mod log_stack;
mod sink;

pub use crate::{
    format_luks::{
        format_luks, DEFAULT_CIPHER, DEFAULT_CIPHER_MODE, DEFAULT_HASH, DEFAULT_VOLUME_KEY_SIZE,
    },
    instrument::{install_default_sink, LogRegistrar},
    log_stack::{IntoIter, Iter, LogEntry, LogStack},
    sink::{capture_sink, default_sink, log_level, LogCallback, LOG_TARGET},
};
