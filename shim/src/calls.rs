//! One instrumented wrapper per libcryptsetup entry point.
//!
//! Every wrapper takes the caller's [`LogStack`] followed by the native arguments in
//! their native order, and returns the native result unchanged.

use libc::c_char;
use libcryptsetup_rs_sys::crypt_device;

use crate::{instrument::instrument_init, LogStack};

/// Initialise a device context for `device`, storing it in `*cd`.
///
/// Messages are only captured if `*cd` already holds a context when the call starts; a
/// freshly created context gets the default sink once the call returns.
///
/// # Safety
///
/// `cd` must be valid for writes and `*cd` null or a live context. `device` must be a
/// valid NUL-terminated path.
pub unsafe fn crypt_init(
    ls: &mut LogStack,
    cd: *mut *mut crypt_device,
    device: *const c_char,
) -> libc::c_int {
    match cd.as_mut() {
        Some(cd) => instrument_init(ls, cd, |cd| {
            libcryptsetup_rs_sys::crypt_init(cd as *mut *mut crypt_device, device)
        }),
        None => libcryptsetup_rs_sys::crypt_init(cd, device),
    }
}

for_each_logcall!(logcalls);

#[cfg(test)]
mod test {
    use std::{ffi::CStr, ptr};

    use libc::c_int;

    use super::*;
    use crate::instrument::fake::{FakeDevice, FakeLibrary};

    unsafe extern "C" fn destroy_unused_slot(cd: *mut crypt_device, keyslot: c_int) -> c_int {
        let dev = &*cd.cast::<FakeDevice>();
        assert_eq!(keyslot, 5);
        dev.log(c"Keyslot 5 is not active.");
        -libc::ENOENT
    }

    unsafe extern "C" fn uuid_of(_cd: *mut crypt_device) -> *const c_char {
        c"0b1d3c6e-8f7a-4e4b-9a52-3d3f2c1e5a77".as_ptr()
    }

    #[test]
    fn test_generated_wrapper_captures_and_passes_status() {
        let lib = FakeLibrary::default();
        let dev = FakeDevice::new();
        let mut ls = LogStack::new();
        let rc = unsafe {
            with_registrar::crypt_keyslot_destroy(
                &lib,
                destroy_unused_slot,
                &mut ls,
                dev.as_ptr(),
                5,
            )
        };
        assert_eq!(rc, -libc::ENOENT);
        assert_eq!(
            ls.iter().collect::<Vec<_>>(),
            vec![c"Keyslot 5 is not active."]
        );
        assert_eq!(lib.registrations.get(), 2);
        assert!(dev.has_callback());
        assert!(!dev.is_capturing());
    }

    #[test]
    fn test_generated_wrapper_passes_pointer_result() {
        let lib = FakeLibrary::default();
        let dev = FakeDevice::new();
        let mut ls = LogStack::new();
        let uuid =
            unsafe { with_registrar::crypt_get_uuid(&lib, uuid_of, &mut ls, dev.as_ptr()) };
        assert_eq!(
            unsafe { CStr::from_ptr(uuid) },
            c"0b1d3c6e-8f7a-4e4b-9a52-3d3f2c1e5a77"
        );
        assert!(ls.is_empty());
        assert!(!dev.is_capturing());
    }

    #[test]
    fn test_generated_wrapper_without_context() {
        let lib = FakeLibrary::default();
        let mut ls = LogStack::new();
        let uuid =
            unsafe { with_registrar::crypt_get_uuid(&lib, uuid_of, &mut ls, ptr::null_mut()) };
        assert!(!uuid.is_null());
        assert_eq!(lib.registrations.get(), 0);
    }
}
