//! `cryptlog_crypt_*` exports, one per wrapped libcryptsetup entry point.
//!
//! Each takes the log stack slot, then the device context, then the native arguments
//! unchanged, and returns the native result unchanged.

use cryptlog_shim::{sys::crypt_device, LogStack};

use crate::with_stack;

macro_rules! export_logcalls {
    ( $(
        $(#[$meta:meta])*
        fn $name:ident ( $( $arg:ident : $ty:ty ),* $(,)? ) -> $ret:ty;
    )* ) => {
        paste::paste! {
            $(
                #[no_mangle]
                $(#[$meta])*
                ///
                /// Messages logged during the call are captured into `ls`; pass NULL to
                /// discard them.
                #[allow(clippy::missing_safety_doc, clippy::unused_unit)]
                pub unsafe extern "C" fn [<cryptlog_ $name>](
                    ls: *mut LogStack,
                    cd: *mut crypt_device,
                    $( $arg: $ty ),*
                ) -> $ret {
                    with_stack(ls, |ls| cryptlog_shim::calls::$name(ls, cd, $( $arg ),*))
                }
            )*
        }
    };
}

cryptlog_shim::for_each_logcall!(export_logcalls);
