//! Safe libcryptsetup device handle.
//!
//! Every operation on a [`Device`] captures what the library logs while it runs. A failed
//! operation returns those messages inside [`CryptError`]; a successful one forwards them
//! to the `log` crate at debug level.
//!
//! ```no_run
//! use cryptlog_device::{Device, Error};
//!
//! fn encrypt(path: &str, key: &[u8]) -> Result<(), Error> {
//!     let mut dev = Device::new(path)?;
//!     dev.format_luks1(key)?;
//!     Ok(())
//! }
//! ```

#[macro_use]
mod macros;

mod activate;
mod benchmark;
mod debug;
mod device;
mod error;
mod keyslot;
mod params;

pub use activate::{ActivateFlags, ActiveDevice};
pub use benchmark::{CipherBenchmark, PbkdfBenchmark};
pub use debug::{set_debug_level, DebugLevel};
pub use device::{Device, RngType};
pub use error::{CryptError, Error};
pub use params::{
    CryptParameter, Format, Kdf, Keyfile, LuksParams, NativeParams, Params, PbkdfParams,
    PlainParams, DEFAULT_CIPHER, DEFAULT_CIPHER_MODE, DEFAULT_HASH, DEFAULT_VOLUME_KEY_SIZE,
};
