use std::ffi::CStr;

use libc::{c_char, c_int, c_void};

use crate::log_stack::LogStack;

/// Signature libcryptsetup expects for logging callbacks
pub type LogCallback = unsafe extern "C" fn(level: c_int, msg: *const c_char, usrptr: *mut c_void);

/// Target used for messages routed through [`default_sink`]
pub const LOG_TARGET: &str = "libcryptsetup";

/// Map a libcryptsetup log level onto the `log` crate's levels
pub fn log_level(level: c_int) -> log::Level {
    match level {
        i if i == libcryptsetup_rs_sys::CRYPT_LOG_ERROR as c_int => log::Level::Error,
        i if i == libcryptsetup_rs_sys::CRYPT_LOG_VERBOSE as c_int => log::Level::Debug,
        i if i == libcryptsetup_rs_sys::CRYPT_LOG_DEBUG as c_int => log::Level::Debug,
        i if i == libcryptsetup_rs_sys::CRYPT_LOG_DEBUG_JSON as c_int => log::Level::Trace,
        _ => log::Level::Info,
    }
}

/// Logging callback that copies each message onto the [`LogStack`] passed as `usrptr`.
///
/// The level is ignored; every message is captured. Copying allocates, and an allocation
/// failure aborts the process through the global allocation error handler.
///
/// # Safety
///
/// `usrptr` must be null or point at a `LogStack` that nothing else touches while the
/// callback runs. `msg` must be null or a valid NUL-terminated string.
pub unsafe extern "C" fn capture_sink(_level: c_int, msg: *const c_char, usrptr: *mut c_void) {
    let stack = match usrptr.cast::<LogStack>().as_mut() {
        Some(stack) => stack,
        None => {
            log::warn!("Capture sink invoked without a log stack, dropping message");
            return;
        }
    };
    if msg.is_null() {
        return;
    }
    stack.push(CStr::from_ptr(msg).to_owned());
}

/// Logging callback installed whenever no capture is in progress. Messages go to the
/// `log` crate under the [`LOG_TARGET`] target.
///
/// # Safety
///
/// `msg` must be null or a valid NUL-terminated string.
pub unsafe extern "C" fn default_sink(level: c_int, msg: *const c_char, _usrptr: *mut c_void) {
    if msg.is_null() {
        return;
    }
    let msg = CStr::from_ptr(msg).to_string_lossy();
    log::log!(target: LOG_TARGET, log_level(level), "{}", msg.trim_end());
}

#[cfg(test)]
mod test {
    use std::ptr;

    use super::*;

    fn capture(ls: &mut LogStack, msg: &CStr) {
        unsafe {
            capture_sink(
                libcryptsetup_rs_sys::CRYPT_LOG_ERROR as c_int,
                msg.as_ptr(),
                ls.as_context(),
            )
        }
    }

    #[test]
    fn test_capture_sink_prepends() {
        let mut ls = LogStack::new();
        capture(&mut ls, c"Device /tmp/x is too small.\n");
        capture(&mut ls, c"Cannot format device.\n");
        let got: Vec<&CStr> = ls.iter().collect();
        assert_eq!(
            got,
            vec![c"Cannot format device.\n", c"Device /tmp/x is too small.\n"]
        );
    }

    #[test]
    fn test_capture_sink_copies_message() {
        let mut ls = LogStack::new();
        let mut buf = *b"transient\0";
        capture(&mut ls, CStr::from_bytes_with_nul(&buf).unwrap());
        buf[0] = b'X';
        assert_eq!(ls.head().unwrap().message(), c"transient");
    }

    #[test]
    fn test_capture_sink_keeps_raw_bytes() {
        let mut ls = LogStack::new();
        capture(&mut ls, CStr::from_bytes_with_nul(b"\xff\xfe\0").unwrap());
        assert_eq!(ls.head().unwrap().message().to_bytes(), b"\xff\xfe");
    }

    #[test]
    fn test_capture_sink_all_levels() {
        let mut ls = LogStack::new();
        for level in [
            libcryptsetup_rs_sys::CRYPT_LOG_NORMAL as c_int,
            libcryptsetup_rs_sys::CRYPT_LOG_VERBOSE as c_int,
            libcryptsetup_rs_sys::CRYPT_LOG_DEBUG as c_int,
        ] {
            unsafe { capture_sink(level, c"msg".as_ptr(), ls.as_context()) };
        }
        assert_eq!(ls.len(), 3);
    }

    #[test]
    fn test_capture_sink_null_arguments() {
        let mut ls = LogStack::new();
        unsafe {
            capture_sink(0, c"lost".as_ptr(), ptr::null_mut());
            capture_sink(0, ptr::null(), ls.as_context());
        }
        assert!(ls.is_empty());
    }

    #[test]
    fn test_default_sink_ignores_context() {
        let mut ls = LogStack::new();
        unsafe {
            default_sink(0, c"to the logger\n".as_ptr(), ls.as_context());
            default_sink(0, ptr::null(), ptr::null_mut());
        }
        assert!(ls.is_empty());
    }

    #[test]
    fn test_log_level() {
        assert_eq!(
            log_level(libcryptsetup_rs_sys::CRYPT_LOG_NORMAL as c_int),
            log::Level::Info
        );
        assert_eq!(
            log_level(libcryptsetup_rs_sys::CRYPT_LOG_ERROR as c_int),
            log::Level::Error
        );
        assert_eq!(
            log_level(libcryptsetup_rs_sys::CRYPT_LOG_VERBOSE as c_int),
            log::Level::Debug
        );
        assert_eq!(
            log_level(libcryptsetup_rs_sys::CRYPT_LOG_DEBUG_JSON as c_int),
            log::Level::Trace
        );
        assert_eq!(log_level(42), log::Level::Info);
    }
}
