//! C interface for hosts that drive libcryptsetup and want each call's log messages.
//!
//! A host declares an empty log stack slot, passes its address to a `cryptlog_crypt_*`
//! call along with the native arguments, then walks and frees the slot:
//!
//! ```c
//! cryptlog_logentry *ls = NULL;
//! int rc = cryptlog_format_luks(&ls, cd);
//! for (const cryptlog_logentry *e = cryptlog_logstack_head(&ls); e;
//!      e = cryptlog_logentry_previous(e))
//!     fprintf(stderr, "%s", cryptlog_logentry_message(e));
//! cryptlog_logstack_free(&ls);
//! ```

use libc::{c_char, c_int};

use cryptlog_shim::{sys::crypt_device, LogStack};

mod calls;
mod logstack;

pub use calls::*;
pub use logstack::*;

/// Run `f` against the stack behind `ls`, or against a throwaway one if `ls` is NULL
unsafe fn with_stack<T>(ls: *mut LogStack, f: impl FnOnce(&mut LogStack) -> T) -> T {
    match ls.as_mut() {
        Some(ls) => f(ls),
        None => {
            let mut scratch = LogStack::new();
            let out = f(&mut scratch);
            log::trace!("Discarding {} messages logged without a stack", scratch.len());
            out
        }
    }
}

/// Route libcryptsetup messages logged outside any instrumented call to the process
/// logger. Only the first call has an effect.
#[no_mangle]
pub extern "C" fn cryptlog_install_default_log() {
    cryptlog_shim::install_default_sink();
}

#[no_mangle]
/// Initialises a device context for `name`, storing it in `*cd`
///
/// Messages are captured only if `*cd` already holds a context.
///
/// Return value:
/// the status of `crypt_init`
#[allow(clippy::missing_safety_doc)]
pub unsafe extern "C" fn cryptlog_crypt_init(
    ls: *mut LogStack,
    cd: *mut *mut crypt_device,
    name: *const c_char,
) -> c_int {
    with_stack(ls, |ls| cryptlog_shim::calls::crypt_init(ls, cd, name))
}

#[no_mangle]
/// Formats a device as LUKS1 with aes-xts-plain64, sha256 and a 256 bit volume key
///
/// Return value:
/// the status of `crypt_format`
#[allow(clippy::missing_safety_doc)]
pub unsafe extern "C" fn cryptlog_format_luks(ls: *mut LogStack, cd: *mut crypt_device) -> c_int {
    with_stack(ls, |ls| cryptlog_shim::format_luks(ls, cd))
}
