/// Invoke `$callback!` with the signature of every native entry point that takes an
/// initialised device context as its first argument. The context itself is left out of
/// each argument list.
///
/// This is the one list of wrapped entry points; the Rust wrappers in
/// [`crate::calls`] and the exported C functions are both generated from it.
#[macro_export]
macro_rules! for_each_logcall {
    ( $callback:ident ) => {
        $callback! {
            /// Format the device with the given type, cipher and parameters
            fn crypt_format(
                type_: *const ::std::os::raw::c_char,
                cipher: *const ::std::os::raw::c_char,
                cipher_mode: *const ::std::os::raw::c_char,
                uuid: *const ::std::os::raw::c_char,
                volume_key: *const ::std::os::raw::c_char,
                volume_key_size: usize,
                params: *mut ::std::os::raw::c_void,
            ) -> ::std::os::raw::c_int;

            /// Load the on-disk header of the given type
            fn crypt_load(
                requested_type: *const ::std::os::raw::c_char,
                params: *mut ::std::os::raw::c_void,
            ) -> ::std::os::raw::c_int;

            /// Get the header UUID; null if the device has none
            fn crypt_get_uuid() -> *const ::std::os::raw::c_char;

            /// Set a new header UUID, or generate one if `uuid` is null
            fn crypt_set_uuid(uuid: *const ::std::os::raw::c_char) -> ::std::os::raw::c_int;

            /// Set a detached data device
            fn crypt_set_data_device(
                device: *const ::std::os::raw::c_char,
            ) -> ::std::os::raw::c_int;

            /// Get the random number generator used for volume keys
            fn crypt_get_rng_type() -> ::std::os::raw::c_int;

            /// Set the key derivation time for new keyslots
            fn crypt_set_iteration_time(iteration_time_ms: u64) -> ();

            /// Add a keyslot unlocked by `passphrase` protected by `new_passphrase`
            fn crypt_keyslot_add_by_passphrase(
                keyslot: ::std::os::raw::c_int,
                passphrase: *const ::std::os::raw::c_char,
                passphrase_size: usize,
                new_passphrase: *const ::std::os::raw::c_char,
                new_passphrase_size: usize,
            ) -> ::std::os::raw::c_int;

            /// Replace the passphrase of a keyslot
            fn crypt_keyslot_change_by_passphrase(
                keyslot_old: ::std::os::raw::c_int,
                keyslot_new: ::std::os::raw::c_int,
                passphrase: *const ::std::os::raw::c_char,
                passphrase_size: usize,
                new_passphrase: *const ::std::os::raw::c_char,
                new_passphrase_size: usize,
            ) -> ::std::os::raw::c_int;

            /// Add a keyslot using key files read from an offset
            fn crypt_keyslot_add_by_keyfile_device_offset(
                keyslot: ::std::os::raw::c_int,
                keyfile: *const ::std::os::raw::c_char,
                keyfile_size: usize,
                keyfile_offset: u64,
                new_keyfile: *const ::std::os::raw::c_char,
                new_keyfile_size: usize,
                new_keyfile_offset: u64,
            ) -> ::std::os::raw::c_int;

            /// Add a keyslot from a raw volume key, or the one kept from formatting if null
            fn crypt_keyslot_add_by_volume_key(
                keyslot: ::std::os::raw::c_int,
                volume_key: *const ::std::os::raw::c_char,
                volume_key_size: usize,
                passphrase: *const ::std::os::raw::c_char,
                passphrase_size: usize,
            ) -> ::std::os::raw::c_int;

            /// Wipe a keyslot
            fn crypt_keyslot_destroy(keyslot: ::std::os::raw::c_int) -> ::std::os::raw::c_int;

            /// Activate a mapping by passphrase, or only check it if `name` is null
            fn crypt_activate_by_passphrase(
                name: *const ::std::os::raw::c_char,
                keyslot: ::std::os::raw::c_int,
                passphrase: *const ::std::os::raw::c_char,
                passphrase_size: usize,
                flags: u32,
            ) -> ::std::os::raw::c_int;

            /// Activate a mapping using a key file read from an offset
            fn crypt_activate_by_keyfile_device_offset(
                name: *const ::std::os::raw::c_char,
                keyslot: ::std::os::raw::c_int,
                keyfile: *const ::std::os::raw::c_char,
                keyfile_size: usize,
                keyfile_offset: u64,
                flags: u32,
            ) -> ::std::os::raw::c_int;

            /// Remove an active mapping
            fn crypt_deactivate(name: *const ::std::os::raw::c_char) -> ::std::os::raw::c_int;

            /// Query an active mapping
            fn crypt_get_active_device(
                name: *const ::std::os::raw::c_char,
                cad: *mut $crate::sys::crypt_active_device,
            ) -> ::std::os::raw::c_int;

            /// Measure cipher throughput in MiB/s
            fn crypt_benchmark(
                cipher: *const ::std::os::raw::c_char,
                cipher_mode: *const ::std::os::raw::c_char,
                volume_key_size: usize,
                iv_size: usize,
                buffer_size: usize,
                encryption_mbs: *mut f64,
                decryption_mbs: *mut f64,
            ) -> ::std::os::raw::c_int;

            /// Measure key derivation cost, filling in `pbkdf`
            fn crypt_benchmark_pbkdf(
                pbkdf: *mut $crate::sys::crypt_pbkdf_type,
                password: *const ::std::os::raw::c_char,
                password_size: usize,
                salt: *const ::std::os::raw::c_char,
                salt_size: usize,
                volume_key_size: usize,
                progress: ::std::option::Option<
                    unsafe extern "C" fn(
                        time_ms: u32,
                        usrptr: *mut ::std::os::raw::c_void,
                    ) -> ::std::os::raw::c_int,
                >,
                usrptr: *mut ::std::os::raw::c_void,
            ) -> ::std::os::raw::c_int;
        }
    };
}

/// Generate one instrumented Rust wrapper per signature handed over by
/// [`for_each_logcall!`], plus a variant of each in `with_registrar` that takes the
/// registrar and the native function explicitly.
macro_rules! logcalls {
    ( $(
        $(#[$meta:meta])*
        fn $name:ident ( $( $arg:ident : $ty:ty ),* $(,)? ) -> $ret:ty;
    )* ) => {
        /// The wrappers of [`crate::calls`] with the log registrar and the native entry
        /// point supplied by the caller
        pub mod with_registrar {
            $(
                $(#[$meta])*
                ///
                /// Messages `native` logs on `cd` are captured into `ls` through
                /// `registrar`.
                ///
                /// # Safety
                ///
                /// Same as the wrapper of the same name in [`crate::calls`]; `native` must
                /// honour the native contract.
                #[allow(clippy::unused_unit)]
                pub unsafe fn $name<R: $crate::instrument::LogRegistrar + ?Sized>(
                    registrar: &R,
                    native: unsafe extern "C" fn(
                        *mut libcryptsetup_rs_sys::crypt_device,
                        $( $ty ),*
                    ) -> $ret,
                    ls: &mut $crate::LogStack,
                    cd: *mut libcryptsetup_rs_sys::crypt_device,
                    $( $arg: $ty ),*
                ) -> $ret {
                    $crate::instrument::instrument_with(registrar, ls, cd, |cd| {
                        native(cd, $( $arg ),*)
                    })
                }
            )*
        }

        $(
            $(#[$meta])*
            ///
            /// Messages logged during the call are captured into `ls`.
            ///
            /// # Safety
            ///
            /// `cd` must be null or a live context from `crypt_init`, not in use on another
            /// thread, and every pointer argument must satisfy the native contract.
            #[allow(clippy::unused_unit)]
            pub unsafe fn $name(
                ls: &mut $crate::LogStack,
                cd: *mut libcryptsetup_rs_sys::crypt_device,
                $( $arg: $ty ),*
            ) -> $ret {
                with_registrar::$name(
                    &$crate::instrument::Libcryptsetup,
                    libcryptsetup_rs_sys::$name,
                    ls,
                    cd,
                    $( $arg ),*
                )
            }
        )*
    };
}
