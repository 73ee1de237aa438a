#![allow(dead_code)]

use std::{io::Write, path::Path, ptr};

use anyhow::{bail, Context as _, Result};
use tempfile::NamedTempFile;

use cryptlog_shim::{calls, sys::crypt_device, LogStack};

const TARGET_TMPDIR: &str = env!("CARGO_TARGET_TMPDIR");

/// Large enough for a LUKS1 header with default alignment plus some data
pub const DEVICE_SIZE: u64 = 16 * 1024 * 1024;

/// Too small for any LUKS1 header
pub const TINY_DEVICE_SIZE: u64 = 4096;

pub fn backing_file(size: u64) -> Result<NamedTempFile> {
    let file = tempfile::Builder::new()
        .prefix("cryptlog-")
        .suffix(".img")
        .tempfile_in(TARGET_TMPDIR)
        .context("Error creating backing file")?;
    file.as_file()
        .set_len(size)
        .context("Error sizing backing file")?;
    Ok(file)
}

pub fn key_file(contents: &[u8]) -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("cryptlog-key-")
        .tempfile_in(TARGET_TMPDIR)
        .context("Error creating key file")?;
    file.write_all(contents)?;
    Ok(file)
}

/// Raw device context, freed on drop
pub struct Context(*mut crypt_device);

impl Context {
    pub fn init(ls: &mut LogStack, path: &Path) -> Result<Self> {
        let path = std::ffi::CString::new(path.to_str().context("Non UTF-8 path")?)?;
        let mut cd: *mut crypt_device = ptr::null_mut();
        let rc = unsafe { calls::crypt_init(ls, &mut cd, path.as_ptr()) };
        if rc < 0 {
            bail!("crypt_init failed with {}", rc);
        }
        Ok(Context(cd))
    }

    pub fn as_ptr(&self) -> *mut crypt_device {
        self.0
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        unsafe { cryptlog_shim::sys::crypt_free(self.0) }
    }
}

pub fn messages(ls: &LogStack) -> Vec<String> {
    ls.iter()
        .map(|m| m.to_string_lossy().trim_end().to_string())
        .collect()
}
