mod common;

use std::os::raw::c_char;

use anyhow::Result;
use pretty_assertions::assert_eq;

use cryptlog_shim::{calls, format_luks, sys, LogStack};

use common::{backing_file, messages, Context, DEVICE_SIZE, TINY_DEVICE_SIZE};

#[test]
#[ignore = "needs libcryptsetup"]
fn format_luks_on_tiny_file_reports_why() -> Result<()> {
    let backing = backing_file(TINY_DEVICE_SIZE)?;
    let mut ls = LogStack::new();
    let cd = Context::init(&mut ls, backing.path())?;
    ls.clear();

    let rc = unsafe { format_luks(&mut ls, cd.as_ptr()) };
    assert!(rc < 0, "format unexpectedly succeeded with {}", rc);
    assert!(!ls.is_empty());
    let head = ls.head().map(|e| e.message().to_string_lossy().into_owned());
    assert!(head.map_or(false, |m| !m.trim().is_empty()));

    ls.clear();
    assert!(ls.is_empty());
    assert_eq!(ls.len(), 0);
    Ok(())
}

#[test]
#[ignore = "needs libcryptsetup and dm-crypt"]
fn consecutive_calls_keep_separate_messages() -> Result<()> {
    let backing = backing_file(DEVICE_SIZE)?;
    let mut init_ls = LogStack::new();
    let cd = Context::init(&mut init_ls, backing.path())?;

    let mut ls = LogStack::new();
    let rc = unsafe { format_luks(&mut ls, cd.as_ptr()) };
    assert_eq!(rc, 0, "format failed: {:?}", messages(&ls));
    unsafe { calls::crypt_set_iteration_time(&mut ls, cd.as_ptr(), 1) };

    let key = b"first passphrase";
    let rc = unsafe {
        calls::crypt_keyslot_add_by_volume_key(
            &mut ls,
            cd.as_ptr(),
            sys::CRYPT_ANY_SLOT,
            std::ptr::null(),
            0,
            key.as_ptr().cast::<c_char>(),
            key.len(),
        )
    };
    assert_eq!(rc, 0, "keyslot add failed: {:?}", messages(&ls));

    let wrong = b"not the passphrase";
    let new_key = b"second passphrase";
    let mut first = LogStack::new();
    let rc = unsafe {
        calls::crypt_keyslot_add_by_passphrase(
            &mut first,
            cd.as_ptr(),
            sys::CRYPT_ANY_SLOT,
            wrong.as_ptr().cast::<c_char>(),
            wrong.len(),
            new_key.as_ptr().cast::<c_char>(),
            new_key.len(),
        )
    };
    assert!(rc < 0);
    let first = messages(&first);
    assert!(!first.is_empty());

    let mut second = LogStack::new();
    let rc = unsafe {
        calls::crypt_keyslot_add_by_passphrase(
            &mut second,
            cd.as_ptr(),
            sys::CRYPT_ANY_SLOT,
            key.as_ptr().cast::<c_char>(),
            key.len(),
            new_key.as_ptr().cast::<c_char>(),
            new_key.len(),
        )
    };
    assert_eq!(rc, 1, "second add failed: {:?}", messages(&second));
    for msg in messages(&second) {
        assert!(!first.contains(&msg), "{:?} leaked into the next call", msg);
    }
    Ok(())
}

#[test]
#[ignore = "needs libcryptsetup"]
fn null_context_passes_status_through() {
    let mut ls = LogStack::new();
    let rc = unsafe { calls::crypt_keyslot_destroy(&mut ls, std::ptr::null_mut(), 0) };
    assert!(rc < 0);
    assert!(ls.is_empty());
}
