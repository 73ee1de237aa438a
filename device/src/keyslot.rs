use std::ptr;

use libc::{c_int, c_uint};

use cryptlog_shim::calls;

use crate::{device::Device, error::Error, params::Keyfile};

fn to_slot(keyslot: c_uint) -> Result<c_int, Error> {
    c_int::try_from(keyslot).map_err(|e| Error::InvalidConversion(e.to_string()))
}

fn slot_or_any(keyslot: Option<c_uint>) -> Result<c_int, Error> {
    keyslot.map_or(Ok(libcryptsetup_rs_sys::CRYPT_ANY_SLOT), to_slot)
}

impl Device {
    /// Add `new_passphrase` to a keyslot, unlocking the volume key with `passphrase`
    pub fn add_key(
        &mut self,
        keyslot: Option<c_uint>,
        passphrase: &[u8],
        new_passphrase: &[u8],
    ) -> Result<c_uint, Error> {
        let slot = slot_or_any(keyslot)?;
        self.call(|ls, cd| unsafe {
            calls::crypt_keyslot_add_by_passphrase(
                ls,
                cd,
                slot,
                to_byte_ptr!(passphrase),
                passphrase.len(),
                to_byte_ptr!(new_passphrase),
                new_passphrase.len(),
            )
        })
        .map(|k| k as c_uint)
    }

    /// Add `passphrase` to a keyslot using a raw volume key, or the key kept in memory
    /// since formatting if `volume_key` is `None`
    pub fn add_key_by_volume_key(
        &mut self,
        keyslot: Option<c_uint>,
        volume_key: Option<&[u8]>,
        passphrase: &[u8],
    ) -> Result<c_uint, Error> {
        let slot = slot_or_any(keyslot)?;
        let (vk, vk_len) = match volume_key {
            Some(vk) => (to_byte_ptr!(vk), vk.len()),
            None => (ptr::null(), 0),
        };
        self.call(|ls, cd| unsafe {
            calls::crypt_keyslot_add_by_volume_key(
                ls,
                cd,
                slot,
                vk,
                vk_len,
                to_byte_ptr!(passphrase),
                passphrase.len(),
            )
        })
        .map(|k| k as c_uint)
    }

    /// Replace the passphrase of whichever keyslot `passphrase` opens
    pub fn change_key(&mut self, passphrase: &[u8], new_passphrase: &[u8]) -> Result<c_uint, Error> {
        self.call(|ls, cd| unsafe {
            calls::crypt_keyslot_change_by_passphrase(
                ls,
                cd,
                libcryptsetup_rs_sys::CRYPT_ANY_SLOT,
                libcryptsetup_rs_sys::CRYPT_ANY_SLOT,
                to_byte_ptr!(passphrase),
                passphrase.len(),
                to_byte_ptr!(new_passphrase),
                new_passphrase.len(),
            )
        })
        .map(|k| k as c_uint)
    }

    /// Add the contents of `new_keyfile` to a keyslot, unlocking with `keyfile`
    pub fn add_key_by_keyfile(
        &mut self,
        keyslot: Option<c_uint>,
        keyfile: &Keyfile,
        new_keyfile: &Keyfile,
    ) -> Result<c_uint, Error> {
        let keyfile_cstring = path_to_cstring!(&keyfile.path)?;
        let new_keyfile_cstring = path_to_cstring!(&new_keyfile.path)?;
        let slot = slot_or_any(keyslot)?;
        self.call(|ls, cd| unsafe {
            calls::crypt_keyslot_add_by_keyfile_device_offset(
                ls,
                cd,
                slot,
                keyfile_cstring.as_ptr(),
                keyfile.size,
                keyfile.offset,
                new_keyfile_cstring.as_ptr(),
                new_keyfile.size,
                new_keyfile.offset,
            )
        })
        .map(|k| k as c_uint)
    }

    /// Wipe a keyslot
    pub fn destroy_keyslot(&mut self, keyslot: c_uint) -> Result<(), Error> {
        let slot = to_slot(keyslot)?;
        self.call(|ls, cd| unsafe { calls::crypt_keyslot_destroy(ls, cd, slot) })?;
        log::info!("Destroyed keyslot {} on {}", keyslot, self.path().display());
        Ok(())
    }

    /// Find the keyslot `passphrase` opens without activating anything
    pub fn verify_key(&mut self, passphrase: &[u8]) -> Result<c_uint, Error> {
        self.call(|ls, cd| unsafe {
            calls::crypt_activate_by_passphrase(
                ls,
                cd,
                ptr::null(),
                libcryptsetup_rs_sys::CRYPT_ANY_SLOT,
                to_byte_ptr!(passphrase),
                passphrase.len(),
                0,
            )
        })
        .map(|k| k as c_uint)
    }

    /// Remove the keyslot that `passphrase` opens
    pub fn del_key(&mut self, passphrase: &[u8]) -> Result<c_uint, Error> {
        let keyslot = self.verify_key(passphrase)?;
        self.destroy_keyslot(keyslot)?;
        Ok(keyslot)
    }
}
