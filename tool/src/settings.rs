use std::{env, path::Path, time::Duration};

use anyhow::{bail, Context, Result};
use glob::glob;
use serde::Deserialize;

use cryptlog_device::{
    DebugLevel, LuksParams, Params, PlainParams, DEFAULT_CIPHER, DEFAULT_CIPHER_MODE,
    DEFAULT_HASH, DEFAULT_VOLUME_KEY_SIZE,
};

pub const COMPONENT: &str = "cryptlog-tool";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebugSetting {
    #[default]
    None,
    All,
    Json,
}

impl From<DebugSetting> for DebugLevel {
    fn from(s: DebugSetting) -> Self {
        match s {
            DebugSetting::None => DebugLevel::None,
            DebugSetting::All => DebugLevel::All,
            DebugSetting::Json => DebugLevel::Json,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub cipher: String,
    pub cipher_mode: String,
    pub hash: String,
    pub key_size_bits: usize,
    /// Key derivation time for new keyslots; the library default if unset
    pub iteration_time_ms: Option<u64>,
    pub debug_level: DebugSetting,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            cipher: DEFAULT_CIPHER.to_string(),
            cipher_mode: DEFAULT_CIPHER_MODE.to_string(),
            hash: DEFAULT_HASH.to_string(),
            key_size_bits: DEFAULT_VOLUME_KEY_SIZE * 8,
            iteration_time_ms: None,
            debug_level: DebugSetting::None,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        settings_for(COMPONENT)?
            .try_deserialize()
            .context("Error parsing configuration")
    }

    pub fn params(&self) -> Result<Params> {
        if self.key_size_bits == 0 || self.key_size_bits % 8 != 0 {
            bail!(
                "Invalid key_size_bits {}: must be a positive multiple of 8",
                self.key_size_bits
            );
        }
        Ok(Params {
            cipher: self.cipher.clone(),
            mode: self.cipher_mode.clone(),
            volume_key_size: self.key_size_bits / 8,
        })
    }

    pub fn luks_params(&self) -> Result<LuksParams> {
        Ok(LuksParams {
            params: self.params()?,
            hash: self.hash.clone(),
            ..Default::default()
        })
    }

    pub fn plain_params(&self) -> Result<PlainParams> {
        Ok(PlainParams {
            params: self.params()?,
            hash: self.hash.clone(),
            ..Default::default()
        })
    }

    pub fn iteration_time(&self) -> Option<Duration> {
        self.iteration_time_ms.map(Duration::from_millis)
    }
}

pub fn settings_for(component: &str) -> Result<config::Config> {
    let conf_d = glob(
        &conf_dir_from_env(&format_conf_dir_env(component))
            .map(|dir| format!("{}/*.yml", dir.trim_end_matches('/')))
            .unwrap_or_else(|| format!("/etc/cryptlog/{}.conf.d/*.yml", component)),
    )
    .context("Invalid configuration directory pattern")?
    .map(|path| path.map(config::File::from))
    .collect::<Result<Vec<_>, _>>()
    .context("Error listing configuration directory")?;

    config::Config::builder()
        .add_source(
            config::File::from(Path::new(&format!("/usr/share/cryptlog/{}.yml", component)))
                .required(false),
        )
        .add_source(
            config::File::from(Path::new(
                &conf_dir_from_env(&format_conf_env(component))
                    .unwrap_or_else(|| format!("/etc/cryptlog/{}.yml", component)),
            ))
            .required(false),
        )
        .add_source(conf_d)
        .build()
        .context("Error loading configuration")
}

pub fn format_conf_env(component: &str) -> String {
    format!("{}_CONF", component_env_prefix(component))
}

pub fn format_conf_dir_env(component: &str) -> String {
    format!("{}_CONF_DIR", component_env_prefix(component))
}

fn component_env_prefix(component: &str) -> String {
    component.replace('-', "_").to_uppercase()
}

fn conf_dir_from_env(key: &str) -> Option<String> {
    env::var_os(key).and_then(|v| v.into_string().ok())
}

#[cfg(test)]
mod test {
    use std::fs;

    use pretty_assertions::assert_eq;

    use super::*;

    // Each test uses its own component name so the environment variables don't collide.

    #[test]
    fn test_env_names() {
        assert_eq!(format_conf_env("cryptlog-tool"), "CRYPTLOG_TOOL_CONF");
        assert_eq!(format_conf_dir_env("cryptlog-tool"), "CRYPTLOG_TOOL_CONF_DIR");
    }

    #[test]
    fn test_defaults_without_files() {
        let dir = tempfile::tempdir().unwrap();
        env::set_var(
            "CRYPTLOG_TEST_EMPTY_CONF",
            dir.path().join("missing.yml"),
        );
        env::set_var("CRYPTLOG_TEST_EMPTY_CONF_DIR", dir.path());
        let settings: Settings = settings_for("cryptlog-test-empty")
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.params().unwrap(), Params::default());
        assert_eq!(settings.iteration_time(), None);
    }

    #[test]
    fn test_conf_d_overrides_main_file() {
        let dir = tempfile::tempdir().unwrap();
        let main = dir.path().join("main.yml");
        fs::write(&main, "cipher: serpent\nkey_size_bits: 512\ndebug_level: all\n").unwrap();
        let conf_d = dir.path().join("conf.d");
        fs::create_dir(&conf_d).unwrap();
        fs::write(conf_d.join("10-hash.yml"), "hash: sha512\nkey_size_bits: 256\n").unwrap();
        fs::write(conf_d.join("20-time.yml"), "iteration_time_ms: 250\n").unwrap();

        env::set_var("CRYPTLOG_TEST_LAYERED_CONF", &main);
        env::set_var("CRYPTLOG_TEST_LAYERED_CONF_DIR", &conf_d);
        let settings: Settings = settings_for("cryptlog-test-layered")
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(settings.cipher, "serpent");
        assert_eq!(settings.cipher_mode, DEFAULT_CIPHER_MODE);
        assert_eq!(settings.hash, "sha512");
        assert_eq!(settings.key_size_bits, 256);
        assert_eq!(settings.debug_level, DebugSetting::All);
        assert_eq!(settings.iteration_time(), Some(Duration::from_millis(250)));

        let luks = settings.luks_params().unwrap();
        assert_eq!(luks.params.cipher, "serpent");
        assert_eq!(luks.params.volume_key_size, 32);
        assert_eq!(luks.hash, "sha512");
    }

    #[test]
    fn test_invalid_key_size() {
        let settings = Settings {
            key_size_bits: 250,
            ..Default::default()
        };
        assert!(settings.params().is_err());
        assert!(settings.plain_params().is_err());
    }

    #[test]
    fn test_debug_setting_conversion() {
        assert_eq!(DebugLevel::from(DebugSetting::Json), DebugLevel::Json);
        assert_eq!(DebugLevel::from(DebugSetting::default()), DebugLevel::None);
    }
}
