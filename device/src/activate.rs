use bitflags::bitflags;
use libc::c_uint;

use cryptlog_shim::calls;

use crate::{device::Device, error::Error, params::Keyfile};

bitflags! {
    /// Activation options
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ActivateFlags: u32 {
        const READONLY = libcryptsetup_rs_sys::CRYPT_ACTIVATE_READONLY;
        const NO_UUID = libcryptsetup_rs_sys::CRYPT_ACTIVATE_NO_UUID;
        const SHARED = libcryptsetup_rs_sys::CRYPT_ACTIVATE_SHARED;
        const ALLOW_DISCARDS = libcryptsetup_rs_sys::CRYPT_ACTIVATE_ALLOW_DISCARDS;
        const PRIVATE = libcryptsetup_rs_sys::CRYPT_ACTIVATE_PRIVATE;
        const SAME_CPU_CRYPT = libcryptsetup_rs_sys::CRYPT_ACTIVATE_SAME_CPU_CRYPT;
        const SUBMIT_FROM_CRYPT_CPUS = libcryptsetup_rs_sys::CRYPT_ACTIVATE_SUBMIT_FROM_CRYPT_CPUS;
    }
}

/// Geometry of an active mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveDevice {
    /// Data offset in sectors
    pub offset: u64,
    /// IV offset in sectors
    pub iv_offset: u64,
    /// Size in sectors
    pub size: u64,
    pub flags: ActivateFlags,
}

impl From<&libcryptsetup_rs_sys::crypt_active_device> for ActiveDevice {
    fn from(v: &libcryptsetup_rs_sys::crypt_active_device) -> Self {
        ActiveDevice {
            offset: v.offset,
            iv_offset: v.iv_offset,
            size: v.size,
            flags: ActivateFlags::from_bits_retain(v.flags),
        }
    }
}

impl Device {
    /// Map the device as `/dev/mapper/<name>`, returning the keyslot `passphrase` opened
    pub fn activate(
        &mut self,
        name: &str,
        passphrase: &[u8],
        flags: ActivateFlags,
    ) -> Result<c_uint, Error> {
        let name_cstring = to_cstring!(name)?;
        let keyslot = self
            .call(|ls, cd| unsafe {
                calls::crypt_activate_by_passphrase(
                    ls,
                    cd,
                    name_cstring.as_ptr(),
                    libcryptsetup_rs_sys::CRYPT_ANY_SLOT,
                    to_byte_ptr!(passphrase),
                    passphrase.len(),
                    flags.bits(),
                )
            })
            .map(|k| k as c_uint)?;
        log::info!("Activated {} as {} using keyslot {}", self.path().display(), name, keyslot);
        Ok(keyslot)
    }

    /// Map the device using key material read from a file
    pub fn activate_by_keyfile(
        &mut self,
        name: &str,
        keyfile: &Keyfile,
        flags: ActivateFlags,
    ) -> Result<c_uint, Error> {
        let name_cstring = to_cstring!(name)?;
        let keyfile_cstring = path_to_cstring!(&keyfile.path)?;
        let keyslot = self
            .call(|ls, cd| unsafe {
                calls::crypt_activate_by_keyfile_device_offset(
                    ls,
                    cd,
                    name_cstring.as_ptr(),
                    libcryptsetup_rs_sys::CRYPT_ANY_SLOT,
                    keyfile_cstring.as_ptr(),
                    keyfile.size,
                    keyfile.offset,
                    flags.bits(),
                )
            })
            .map(|k| k as c_uint)?;
        log::info!("Activated {} as {} using keyslot {}", self.path().display(), name, keyslot);
        Ok(keyslot)
    }

    /// Remove the mapping `name`
    pub fn deactivate(&mut self, name: &str) -> Result<(), Error> {
        let name_cstring = to_cstring!(name)?;
        self.call(|ls, cd| unsafe { calls::crypt_deactivate(ls, cd, name_cstring.as_ptr()) })?;
        log::info!("Deactivated {}", name);
        Ok(())
    }

    /// Geometry of the active mapping `name`
    pub fn active_device(&mut self, name: &str) -> Result<ActiveDevice, Error> {
        let name_cstring = to_cstring!(name)?;
        let mut cad = libcryptsetup_rs_sys::crypt_active_device {
            offset: 0,
            iv_offset: 0,
            size: 0,
            flags: 0,
        };
        self.call(|ls, cd| unsafe {
            calls::crypt_get_active_device(ls, cd, name_cstring.as_ptr(), &mut cad as *mut _)
        })?;
        Ok(ActiveDevice::from(&cad))
    }
}
