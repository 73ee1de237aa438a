use std::{ffi::CStr, ptr};

use libc::{c_char, c_int};
use libcryptsetup_rs_sys::{crypt_device, crypt_params_luks1};

use crate::{instrument::instrument, LogStack};

pub const DEFAULT_CIPHER: &CStr = c"aes";
pub const DEFAULT_CIPHER_MODE: &CStr = c"xts-plain64";
pub const DEFAULT_HASH: &CStr = c"sha256";
/// Volume key size in bytes
pub const DEFAULT_VOLUME_KEY_SIZE: usize = 256 / 8;

/// Format `cd` as LUKS1 with aes-xts-plain64, a sha256 header hash and a 256 bit volume
/// key. The UUID and volume key are generated, data stays on the same device and the
/// alignment is left to the library.
///
/// Returns the status of `crypt_format`.
///
/// # Safety
///
/// `cd` must be null or a live context not in use on another thread.
pub unsafe fn format_luks(ls: &mut LogStack, cd: *mut crypt_device) -> c_int {
    let mut params = crypt_params_luks1 {
        hash: DEFAULT_HASH.as_ptr(),
        data_alignment: 0,
        data_device: ptr::null(),
    };
    instrument(ls, cd, |cd| {
        libcryptsetup_rs_sys::crypt_format(
            cd,
            libcryptsetup_rs_sys::CRYPT_LUKS1.as_ptr().cast::<c_char>(),
            DEFAULT_CIPHER.as_ptr(),
            DEFAULT_CIPHER_MODE.as_ptr(),
            ptr::null(),
            ptr::null(),
            DEFAULT_VOLUME_KEY_SIZE,
            (&mut params as *mut crypt_params_luks1).cast(),
        )
    })
}
