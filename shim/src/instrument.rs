//! Install a capturing sink around a single native call.
//!
//! libcryptsetup keeps one logging callback per device context, so the sink swap below
//! is not safe for two calls sharing a context at the same time. Callers serialize per
//! context; nothing here locks.

use std::{ptr, sync::Once};

use libc::c_void;
use libcryptsetup_rs_sys::crypt_device;

use crate::{
    log_stack::LogStack,
    sink::{capture_sink, default_sink, LogCallback},
};

/// Something that can register a logging callback on a device context
pub trait LogRegistrar {
    /// Register `callback` with `usrptr` on `cd`. A null `cd` addresses the process-wide
    /// callback used by contexts that never registered their own.
    ///
    /// # Safety
    ///
    /// `cd` must be null or a live device context, and `usrptr` must stay valid for as
    /// long as `callback` remains registered.
    unsafe fn set_log_callback(
        &self,
        cd: *mut crypt_device,
        callback: Option<LogCallback>,
        usrptr: *mut c_void,
    );
}

/// The real library
pub struct Libcryptsetup;

impl LogRegistrar for Libcryptsetup {
    unsafe fn set_log_callback(
        &self,
        cd: *mut crypt_device,
        callback: Option<LogCallback>,
        usrptr: *mut c_void,
    ) {
        libcryptsetup_rs_sys::crypt_set_log_callback(cd, callback, usrptr)
    }
}

static INSTALL_DEFAULT_SINK: Once = Once::new();

/// Route the library's process-wide logging through [`default_sink`]. Only the first call
/// has an effect.
pub fn install_default_sink() {
    INSTALL_DEFAULT_SINK.call_once(|| {
        log::debug!("Installing default libcryptsetup log sink");
        unsafe { Libcryptsetup.set_log_callback(ptr::null_mut(), Some(default_sink), ptr::null_mut()) }
    });
}

unsafe fn start_capture<R>(registrar: &R, ls: &mut LogStack, cd: *mut crypt_device)
where
    R: LogRegistrar + ?Sized,
{
    registrar.set_log_callback(cd, Some(capture_sink), ls.as_context());
}

unsafe fn stop_capture<R>(registrar: &R, cd: *mut crypt_device)
where
    R: LogRegistrar + ?Sized,
{
    registrar.set_log_callback(cd, Some(default_sink), ptr::null_mut());
}

/// Puts the default sink back even if the wrapped call unwinds.
struct CaptureGuard<'r, R: LogRegistrar + ?Sized> {
    registrar: &'r R,
    cd: *mut crypt_device,
}

impl<'r, R: LogRegistrar + ?Sized> Drop for CaptureGuard<'r, R> {
    fn drop(&mut self) {
        unsafe { stop_capture(self.registrar, self.cd) }
    }
}

/// Run `op` against `cd` with every message the library logs on `cd` captured into `ls`.
///
/// The result of `op` is returned untouched. A null `cd` is passed straight through with
/// no capture, since registering on a null context would replace the process-wide
/// callback.
///
/// # Safety
///
/// `cd` must be null or a live device context that no other thread is using, and `op`
/// must not retain `cd`'s logging registration past its return.
pub unsafe fn instrument_with<R, T, F>(
    registrar: &R,
    ls: &mut LogStack,
    cd: *mut crypt_device,
    op: F,
) -> T
where
    R: LogRegistrar + ?Sized,
    F: FnOnce(*mut crypt_device) -> T,
{
    if cd.is_null() {
        log::trace!("No device context, calling without log capture");
        return op(cd);
    }
    start_capture(registrar, ls, cd);
    let _guard = CaptureGuard { registrar, cd };
    op(cd)
}

/// Variant of [`instrument_with`] for the call that creates the context.
///
/// The sink is only installed if `*cd` already names a context before the call. Afterwards
/// the default sink is restored on that context and on whatever context `*cd` names after
/// the call, if the two differ.
///
/// # Safety
///
/// Same as [`instrument_with`]; `*cd` must be null or a live device context.
pub unsafe fn instrument_init_with<R, T, F>(
    registrar: &R,
    ls: &mut LogStack,
    cd: &mut *mut crypt_device,
    op: F,
) -> T
where
    R: LogRegistrar + ?Sized,
    F: FnOnce(&mut *mut crypt_device) -> T,
{
    let before = *cd;
    let _guard = (!before.is_null()).then(|| {
        start_capture(registrar, ls, before);
        CaptureGuard {
            registrar,
            cd: before,
        }
    });
    let out = op(cd);
    if !cd.is_null() && *cd != before {
        stop_capture(registrar, *cd);
    }
    out
}

/// [`instrument_with`] against libcryptsetup
///
/// # Safety
///
/// See [`instrument_with`].
pub unsafe fn instrument<T, F>(ls: &mut LogStack, cd: *mut crypt_device, op: F) -> T
where
    F: FnOnce(*mut crypt_device) -> T,
{
    instrument_with(&Libcryptsetup, ls, cd, op)
}

/// [`instrument_init_with`] against libcryptsetup
///
/// # Safety
///
/// See [`instrument_init_with`].
pub unsafe fn instrument_init<T, F>(ls: &mut LogStack, cd: &mut *mut crypt_device, op: F) -> T
where
    F: FnOnce(&mut *mut crypt_device) -> T,
{
    instrument_init_with(&Libcryptsetup, ls, cd, op)
}
