use std::{
    ffi::CStr,
    path::{Path, PathBuf},
    ptr,
    time::Duration,
};

use libc::{c_int, c_uint};
use uuid::Uuid;

use cryptlog_shim::{calls, sys::crypt_device, LogStack, LOG_TARGET};

use crate::{
    error::{check, Error},
    params::{CryptParameter, Format},
};

/// Random number generator libcryptsetup uses for volume keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RngType {
    Urandom,
    Random,
}

/// An open libcryptsetup device context.
///
/// Every call installs a fresh capture for its own messages, so errors carry exactly
/// what the library logged while failing. The context is freed on drop.
pub struct Device {
    cd: *mut crypt_device,
    path: PathBuf,
}

impl Device {
    /// Open a context for the block device or image file at `path`
    pub fn new(path: impl AsRef<Path>) -> Result<Self, Error> {
        cryptlog_shim::install_default_sink();

        let path = path.as_ref();
        let path_cstring = path_to_cstring!(path)?;
        let mut cd: *mut crypt_device = ptr::null_mut();
        let mut ls = LogStack::new();
        let rc = unsafe { calls::crypt_init(&mut ls, &mut cd, path_cstring.as_ptr()) };
        if let Err(e) = check(rc, ls) {
            if !cd.is_null() {
                unsafe { libcryptsetup_rs_sys::crypt_free(cd) };
            }
            return Err(e);
        }
        log::debug!("Opened device context for {}", path.display());
        Ok(Device {
            cd,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run one instrumented call against the context and check its status
    pub(crate) fn call<F>(&mut self, op: F) -> Result<c_int, Error>
    where
        F: FnOnce(&mut LogStack, *mut crypt_device) -> c_int,
    {
        let mut ls = LogStack::new();
        let rc = op(&mut ls, self.cd);
        check(rc, ls)
    }

    /// Write a new header with `params` and protect its volume key with `key`.
    ///
    /// Formats without keyslots are only formatted; `key` is used again at activation.
    pub fn format<P>(&mut self, key: &[u8], params: &P) -> Result<(), Error>
    where
        P: CryptParameter + ?Sized,
    {
        let format = params.format();
        let base = params.params();
        let cipher = to_cstring!(base.cipher)?;
        let mode = to_cstring!(base.mode)?;
        let mut native = params.to_native()?;
        let volume_key_size = base.volume_key_size;

        self.call(|ls, cd| unsafe {
            calls::crypt_format(
                ls,
                cd,
                format.as_ptr(),
                cipher.as_ptr(),
                mode.as_ptr(),
                ptr::null(),
                ptr::null(),
                volume_key_size,
                native.as_mut_ptr(),
            )
        })?;
        log::info!("Formatted {} as {}", self.path.display(), format.name());

        if format.has_keyslots() {
            self.add_key_by_volume_key(None, None, key)?;
        }
        Ok(())
    }

    /// Format as LUKS1 with aes-xts-plain64, sha256 and a 256 bit volume key, then add
    /// `key` to the first free keyslot
    pub fn format_luks1(&mut self, key: &[u8]) -> Result<c_uint, Error> {
        self.call(|ls, cd| unsafe { cryptlog_shim::format_luks(ls, cd) })?;
        log::info!("Formatted {} as LUKS1", self.path.display());
        self.add_key_by_volume_key(None, None, key)
    }

    /// Load the on-disk header. `None` accepts any format the library recognises.
    pub fn load(&mut self, format: Option<Format>) -> Result<(), Error> {
        let requested = format.map_or(ptr::null(), |f| f.as_ptr());
        self.call(|ls, cd| unsafe { calls::crypt_load(ls, cd, requested, ptr::null_mut()) })?;
        Ok(())
    }

    /// The header UUID, if the loaded format has one
    pub fn uuid(&mut self) -> Result<Option<Uuid>, Error> {
        let mut ls = LogStack::new();
        let p = unsafe { calls::crypt_get_uuid(&mut ls, self.cd) };
        check(0, ls)?;
        if p.is_null() {
            return Ok(None);
        }
        let s = unsafe { CStr::from_ptr(p) }
            .to_str()
            .map_err(|e| Error::InvalidConversion(e.to_string()))?;
        Ok(Some(Uuid::parse_str(s)?))
    }

    /// Set the header UUID, or generate a new one if `uuid` is `None`
    pub fn set_uuid(&mut self, uuid: Option<Uuid>) -> Result<(), Error> {
        let uuid_cstring = match uuid {
            Some(u) => Some(to_cstring!(u.hyphenated().to_string())?),
            None => None,
        };
        self.call(|ls, cd| unsafe { calls::crypt_set_uuid(ls, cd, opt_ptr!(uuid_cstring)) })?;
        Ok(())
    }

    /// Use a detached data device with the loaded header
    pub fn set_data_device(&mut self, path: &Path) -> Result<(), Error> {
        let path_cstring = path_to_cstring!(path)?;
        self.call(|ls, cd| unsafe { calls::crypt_set_data_device(ls, cd, path_cstring.as_ptr()) })?;
        Ok(())
    }

    pub fn rng_type(&mut self) -> Result<RngType, Error> {
        let rc = self.call(|ls, cd| unsafe { calls::crypt_get_rng_type(ls, cd) })?;
        match rc {
            i if i == libcryptsetup_rs_sys::CRYPT_RNG_URANDOM as c_int => Ok(RngType::Urandom),
            i if i == libcryptsetup_rs_sys::CRYPT_RNG_RANDOM as c_int => Ok(RngType::Random),
            i => Err(Error::InvalidConversion(format!("unknown RNG type {}", i))),
        }
    }

    /// Set how long key derivation should take for keyslots added from now on
    pub fn set_iteration_time(&mut self, time: Duration) {
        let ms = u64::try_from(time.as_millis()).unwrap_or(u64::MAX);
        let mut ls = LogStack::new();
        unsafe { calls::crypt_set_iteration_time(&mut ls, self.cd, ms) };
        for msg in ls.into_chronological() {
            log::debug!(target: LOG_TARGET, "{}", msg.trim_end());
        }
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        log::trace!("Freeing device context for {}", self.path.display());
        unsafe { libcryptsetup_rs_sys::crypt_free(self.cd) }
    }
}
