use std::{
    ffi::{c_void, CStr, CString},
    path::PathBuf,
    ptr,
    str::FromStr,
    time::Duration,
};

use libc::c_char;

use crate::error::Error;

pub const DEFAULT_CIPHER: &str = "aes";
pub const DEFAULT_CIPHER_MODE: &str = "xts-plain64";
pub const DEFAULT_HASH: &str = "sha256";
pub const DEFAULT_VOLUME_KEY_SIZE: usize = 256 / 8;

/// On-disk format of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Headerless dm-crypt
    Plain,
    Luks1,
    Luks2,
}

impl Format {
    pub(crate) fn as_ptr(&self) -> *const c_char {
        match *self {
            Format::Plain => libcryptsetup_rs_sys::CRYPT_PLAIN.as_ptr().cast::<c_char>(),
            Format::Luks1 => libcryptsetup_rs_sys::CRYPT_LUKS1.as_ptr().cast::<c_char>(),
            Format::Luks2 => libcryptsetup_rs_sys::CRYPT_LUKS2.as_ptr().cast::<c_char>(),
        }
    }

    /// Name libcryptsetup uses for the format
    pub fn name(&self) -> &'static str {
        let bytes: &'static [u8] = match *self {
            Format::Plain => &libcryptsetup_rs_sys::CRYPT_PLAIN[..],
            Format::Luks1 => &libcryptsetup_rs_sys::CRYPT_LUKS1[..],
            Format::Luks2 => &libcryptsetup_rs_sys::CRYPT_LUKS2[..],
        };
        CStr::from_bytes_with_nul(bytes)
            .ok()
            .and_then(|s| s.to_str().ok())
            .unwrap_or_default()
    }

    /// Whether the format stores keyslots in a header
    pub fn has_keyslots(&self) -> bool {
        !matches!(self, Format::Plain)
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Format::Plain, Format::Luks1, Format::Luks2]
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::InvalidConversion(format!("unknown device format {}", s)))
    }
}

/// Parameters shared by every format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Params {
    pub cipher: String,
    pub mode: String,
    /// Volume key size in bytes
    pub volume_key_size: usize,
}

impl Default for Params {
    fn default() -> Self {
        Params {
            cipher: DEFAULT_CIPHER.to_string(),
            mode: DEFAULT_CIPHER_MODE.to_string(),
            volume_key_size: DEFAULT_VOLUME_KEY_SIZE,
        }
    }
}

/// LUKS1 header parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LuksParams {
    pub params: Params,
    /// Hash used for the header's key digest
    pub hash: String,
    /// Data alignment in sectors, 0 to let the library pick
    pub data_alignment: usize,
    /// Detached data device; the header and data share a device if unset
    pub data_device: Option<PathBuf>,
}

impl Default for LuksParams {
    fn default() -> Self {
        LuksParams {
            params: Params::default(),
            hash: DEFAULT_HASH.to_string(),
            data_alignment: 0,
            data_device: None,
        }
    }
}

/// Parameters for headerless encryption. The result is indistinguishable from random
/// data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlainParams {
    pub params: Params,
    /// Passphrase hash
    pub hash: String,
    /// Data offset in sectors
    pub offset: u64,
    /// IV offset in sectors
    pub skip: u64,
    /// Size of the mapping in sectors, 0 for the whole device
    pub size: u64,
}

impl Default for PlainParams {
    fn default() -> Self {
        PlainParams {
            params: Params::default(),
            hash: DEFAULT_HASH.to_string(),
            offset: 0,
            skip: 0,
            size: 0,
        }
    }
}

/// Native parameter block for `crypt_format`, owning the strings it points at
pub struct NativeParams {
    inner: NativeInner,
}

enum NativeInner {
    Luks1 {
        inner: libcryptsetup_rs_sys::crypt_params_luks1,
        #[allow(dead_code)]
        hash: CString,
        #[allow(dead_code)]
        data_device: Option<CString>,
    },
    Plain {
        inner: libcryptsetup_rs_sys::crypt_params_plain,
        #[allow(dead_code)]
        hash: CString,
    },
}

impl NativeParams {
    pub(crate) fn as_mut_ptr(&mut self) -> *mut c_void {
        match self.inner {
            NativeInner::Luks1 { ref mut inner, .. } => {
                (inner as *mut libcryptsetup_rs_sys::crypt_params_luks1).cast::<c_void>()
            }
            NativeInner::Plain { ref mut inner, .. } => {
                (inner as *mut libcryptsetup_rs_sys::crypt_params_plain).cast::<c_void>()
            }
        }
    }
}

/// A set of format parameters that can be handed to libcryptsetup
pub trait CryptParameter {
    fn format(&self) -> Format;

    fn params(&self) -> &Params;

    fn to_native(&self) -> Result<NativeParams, Error>;
}

impl CryptParameter for LuksParams {
    fn format(&self) -> Format {
        Format::Luks1
    }

    fn params(&self) -> &Params {
        &self.params
    }

    fn to_native(&self) -> Result<NativeParams, Error> {
        let hash = to_cstring!(self.hash)?;
        let data_device = match self.data_device {
            Some(ref path) => Some(path_to_cstring!(path)?),
            None => None,
        };
        let inner = libcryptsetup_rs_sys::crypt_params_luks1 {
            hash: hash.as_ptr(),
            data_alignment: self.data_alignment,
            data_device: opt_ptr!(data_device),
        };
        Ok(NativeParams {
            inner: NativeInner::Luks1 {
                inner,
                hash,
                data_device,
            },
        })
    }
}

impl CryptParameter for PlainParams {
    fn format(&self) -> Format {
        Format::Plain
    }

    fn params(&self) -> &Params {
        &self.params
    }

    fn to_native(&self) -> Result<NativeParams, Error> {
        let hash = to_cstring!(self.hash)?;
        let inner = libcryptsetup_rs_sys::crypt_params_plain {
            hash: hash.as_ptr(),
            offset: self.offset,
            skip: self.skip,
            size: self.size,
            sector_size: 0,
        };
        Ok(NativeParams {
            inner: NativeInner::Plain { inner, hash },
        })
    }
}

/// Key material read from a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyfile {
    pub path: PathBuf,
    /// Bytes to read, 0 for the whole file
    pub size: usize,
    /// Bytes to skip at the start of the file
    pub offset: u64,
}

impl Keyfile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Keyfile {
            path: path.into(),
            size: 0,
            offset: 0,
        }
    }
}

/// Key derivation function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kdf {
    Pbkdf2,
    Argon2i,
    Argon2id,
}

impl Kdf {
    pub(crate) fn as_ptr(&self) -> *const c_char {
        match *self {
            Kdf::Pbkdf2 => libcryptsetup_rs_sys::CRYPT_KDF_PBKDF2.as_ptr().cast::<c_char>(),
            Kdf::Argon2i => libcryptsetup_rs_sys::CRYPT_KDF_ARGON2I.as_ptr().cast::<c_char>(),
            Kdf::Argon2id => libcryptsetup_rs_sys::CRYPT_KDF_ARGON2ID.as_ptr().cast::<c_char>(),
        }
    }
}

impl FromStr for Kdf {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pbkdf2" => Ok(Kdf::Pbkdf2),
            "argon2i" => Ok(Kdf::Argon2i),
            "argon2id" => Ok(Kdf::Argon2id),
            _ => Err(Error::InvalidConversion(format!("unknown KDF {}", s))),
        }
    }
}

/// Inputs to a key derivation benchmark
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PbkdfParams {
    pub kdf: Kdf,
    /// Hash for PBKDF2; ignored by the Argon2 variants
    pub hash: String,
    /// Target time for one derivation
    pub time: Duration,
    pub max_memory_kb: u32,
    pub parallel_threads: u32,
}

impl Default for PbkdfParams {
    fn default() -> Self {
        PbkdfParams {
            kdf: Kdf::Pbkdf2,
            hash: DEFAULT_HASH.to_string(),
            time: Duration::from_secs(1),
            max_memory_kb: 0,
            parallel_threads: 0,
        }
    }
}

impl PbkdfParams {
    /// Build the native struct. `hash` must outlive it.
    pub(crate) fn to_native(
        &self,
        hash: &CString,
    ) -> libcryptsetup_rs_sys::crypt_pbkdf_type {
        libcryptsetup_rs_sys::crypt_pbkdf_type {
            type_: self.kdf.as_ptr(),
            hash: match self.kdf {
                Kdf::Pbkdf2 => hash.as_ptr(),
                _ => ptr::null(),
            },
            time_ms: u32::try_from(self.time.as_millis()).unwrap_or(u32::MAX),
            iterations: 0,
            max_memory_kb: self.max_memory_kb,
            parallel_threads: self.parallel_threads,
            flags: 0,
        }
    }
}
