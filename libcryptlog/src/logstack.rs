use std::ptr::null;

use libc::{c_char, size_t};

use cryptlog_shim::{LogEntry, LogStack};

#[no_mangle]
/// Returns the number of messages in a log stack
///
/// Return value:
/// 0 if `ls` is NULL or empty
pub extern "C" fn cryptlog_logstack_len(ls: *const LogStack) -> size_t {
    match unsafe { ls.as_ref() } {
        None => 0,
        Some(ls) => ls.len(),
    }
}

#[no_mangle]
/// Returns the newest message of a log stack
///
/// Note: the entry is still owned by the stack, and should *NOT* be freed by the caller.
///
/// Return value:
/// NULL if `ls` is NULL or empty
/// Pointer to the newest entry otherwise
pub extern "C" fn cryptlog_logstack_head(ls: *const LogStack) -> *const LogEntry {
    match unsafe { ls.as_ref() }.and_then(LogStack::head) {
        None => null(),
        Some(entry) => entry as *const _,
    }
}

#[no_mangle]
/// Returns the text of a log entry, exactly as libcryptsetup logged it
///
/// Note: the string is owned by the entry and stays valid until the stack is freed.
///
/// Return value:
/// NULL if `entry` is NULL
pub extern "C" fn cryptlog_logentry_message(entry: *const LogEntry) -> *const c_char {
    match unsafe { entry.as_ref() } {
        None => null(),
        Some(entry) => entry.message().as_ptr(),
    }
}

#[no_mangle]
/// Returns the entry logged just before `entry`
///
/// Return value:
/// NULL if `entry` is NULL or the oldest entry
pub extern "C" fn cryptlog_logentry_previous(entry: *const LogEntry) -> *const LogEntry {
    match unsafe { entry.as_ref() }.and_then(LogEntry::previous) {
        None => null(),
        Some(previous) => previous as *const _,
    }
}

#[no_mangle]
/// Frees every entry of a log stack, leaving it empty
///
/// Entry and message pointers obtained from the stack are invalid afterwards.
pub extern "C" fn cryptlog_logstack_free(ls: *mut LogStack) {
    if let Some(ls) = unsafe { ls.as_mut() } {
        ls.clear();
    }
}
