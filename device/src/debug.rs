use std::str::FromStr;

use libc::c_int;

use crate::error::Error;

/// Amount of internal debugging libcryptsetup logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DebugLevel {
    #[default]
    None,
    All,
    /// Everything, plus LUKS2 metadata dumps
    Json,
}

impl DebugLevel {
    fn as_raw(self) -> c_int {
        match self {
            DebugLevel::None => libcryptsetup_rs_sys::CRYPT_DEBUG_NONE as c_int,
            DebugLevel::All => libcryptsetup_rs_sys::CRYPT_DEBUG_ALL as c_int,
            DebugLevel::Json => libcryptsetup_rs_sys::CRYPT_DEBUG_JSON as c_int,
        }
    }
}

impl FromStr for DebugLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(DebugLevel::None),
            "all" => Ok(DebugLevel::All),
            "json" => Ok(DebugLevel::Json),
            _ => Err(Error::InvalidConversion(format!("unknown debug level {}", s))),
        }
    }
}

/// Set the process-wide debug level. Debug output arrives through the same sinks as
/// every other message.
pub fn set_debug_level(level: DebugLevel) {
    log::debug!("Setting libcryptsetup debug level to {:?}", level);
    unsafe { libcryptsetup_rs_sys::crypt_set_debug_level(level.as_raw()) }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_debug_level() {
        assert_eq!("all".parse::<DebugLevel>().unwrap(), DebugLevel::All);
        assert_eq!("JSON".parse::<DebugLevel>().unwrap(), DebugLevel::Json);
        assert_eq!(DebugLevel::default(), DebugLevel::None);
        assert!("verbose".parse::<DebugLevel>().is_err());
    }

    #[test]
    fn test_raw_levels_are_distinct() {
        assert_eq!(DebugLevel::None.as_raw(), 0);
        assert_ne!(DebugLevel::All.as_raw(), DebugLevel::Json.as_raw());
    }
}
