use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use secrecy::{ExposeSecret, SecretVec};
use serde::Serialize;

use cryptlog_device::{set_debug_level, ActivateFlags, Device, Kdf, PbkdfParams};

mod settings;

use settings::Settings;

// Fixed inputs for KDF benchmarking; only the cost matters, not the derived key.
const BENCHMARK_PASSWORD: &[u8] = b"foobarfo";
const BENCHMARK_SALT: &[u8] = b"0123456789abcdef0123456789abcdef";

#[derive(Parser)]
#[clap(version = "0.1")]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Formats a device and protects it with a key file
    Format(FormatArguments),
    /// Adds a key to a free keyslot
    AddKey(AddKeyArguments),
    /// Removes the keyslot a key opens
    RemoveKey(KeyArguments),
    /// Activates a device mapping
    Open(OpenArguments),
    /// Removes a device mapping
    Close(MappingArguments),
    /// Prints header and mapping details
    Status(MappingArguments),
    /// Measures cipher throughput
    Benchmark(BenchmarkArguments),
    /// Measures key derivation cost
    BenchmarkPbkdf(BenchmarkPbkdfArguments),
}

#[derive(Copy, Clone, ValueEnum)]
enum FormatType {
    Luks1,
    Plain,
}

#[derive(Copy, Clone, ValueEnum)]
enum KdfType {
    Pbkdf2,
    Argon2i,
    Argon2id,
}

impl From<KdfType> for Kdf {
    fn from(k: KdfType) -> Self {
        match k {
            KdfType::Pbkdf2 => Kdf::Pbkdf2,
            KdfType::Argon2i => Kdf::Argon2i,
            KdfType::Argon2id => Kdf::Argon2id,
        }
    }
}

#[derive(Args)]
struct FormatArguments {
    /// Path to the block device or image file
    device: PathBuf,
    /// File holding the key
    #[clap(long, action = ArgAction::Set)]
    key_file: PathBuf,
    /// On-disk format
    #[clap(value_enum, long, default_value = "luks1", action = ArgAction::Set)]
    format: FormatType,
    /// Use the built-in LUKS1 defaults instead of the configured cipher
    #[clap(long, action = ArgAction::SetTrue)]
    defaults: bool,
}

#[derive(Args)]
struct KeyArguments {
    /// Path to the block device or image file
    device: PathBuf,
    /// File holding an existing key
    #[clap(long, action = ArgAction::Set)]
    key_file: PathBuf,
}

#[derive(Args)]
struct AddKeyArguments {
    #[clap(flatten)]
    existing: KeyArguments,
    /// File holding the key to add
    #[clap(long, action = ArgAction::Set)]
    new_key_file: PathBuf,
    /// Keyslot to use, or the first free one
    #[clap(long, action = ArgAction::Set)]
    keyslot: Option<u32>,
}

#[derive(Args)]
struct OpenArguments {
    #[clap(flatten)]
    key: KeyArguments,
    /// Name of the mapping under /dev/mapper
    name: String,
    /// Map read-only
    #[clap(long, action = ArgAction::SetTrue)]
    readonly: bool,
    /// Pass discard requests through to the device
    #[clap(long, action = ArgAction::SetTrue)]
    allow_discards: bool,
}

#[derive(Args)]
struct MappingArguments {
    /// Path to the block device or image file
    device: PathBuf,
    /// Name of the mapping under /dev/mapper
    name: String,
}

#[derive(Args)]
struct BenchmarkArguments {
    /// Any device libcryptsetup can open, used for the context only
    device: PathBuf,
    /// IV size in bytes
    #[clap(long, default_value_t = 16, action = ArgAction::Set)]
    iv_size: usize,
    /// Size of the buffer to encrypt in bytes
    #[clap(long, default_value_t = 1024 * 1024, action = ArgAction::Set)]
    buffer_size: usize,
}

#[derive(Args)]
struct BenchmarkPbkdfArguments {
    /// Any device libcryptsetup can open, used for the context only
    device: PathBuf,
    #[clap(value_enum, long, default_value = "pbkdf2", action = ArgAction::Set)]
    kdf: KdfType,
    /// Target derivation time in milliseconds
    #[clap(long, default_value_t = 1000, action = ArgAction::Set)]
    time_ms: u64,
}

#[derive(Serialize)]
struct StatusReport {
    device: String,
    uuid: Option<String>,
    mapping: String,
    offset: u64,
    iv_offset: u64,
    size: u64,
    readonly: bool,
}

#[derive(Serialize)]
struct CipherReport {
    cipher: String,
    key_size_bits: usize,
    encryption_mib_s: f64,
    decryption_mib_s: f64,
}

#[derive(Serialize)]
struct PbkdfReport {
    iterations: u32,
    max_memory_kb: u32,
    parallel_threads: u32,
}

fn read_key(path: &Path) -> Result<SecretVec<u8>> {
    let key = fs::read(path).with_context(|| format!("Error reading key file {:?}", path))?;
    if key.is_empty() {
        bail!("Key file {:?} is empty", path);
    }
    Ok(SecretVec::new(key))
}

fn open_device(path: &Path, settings: &Settings) -> Result<Device> {
    let mut dev =
        Device::new(path).with_context(|| format!("Error opening device {:?}", path))?;
    if let Some(time) = settings.iteration_time() {
        dev.set_iteration_time(time);
    }
    Ok(dev)
}

fn load_device(path: &Path, settings: &Settings) -> Result<Device> {
    let mut dev = open_device(path, settings)?;
    dev.load(None)
        .with_context(|| format!("Error loading header from {:?}", path))?;
    Ok(dev)
}

fn format(args: &FormatArguments, settings: &Settings) -> Result<()> {
    let key = read_key(&args.key_file)?;
    let mut dev = open_device(&args.device, settings)?;
    match args.format {
        FormatType::Luks1 if args.defaults => {
            let keyslot = dev
                .format_luks1(key.expose_secret())
                .with_context(|| format!("Error formatting {:?}", args.device))?;
            log::info!("Key added to keyslot {}", keyslot);
        }
        FormatType::Luks1 => dev
            .format(key.expose_secret(), &settings.luks_params()?)
            .with_context(|| format!("Error formatting {:?}", args.device))?,
        FormatType::Plain => dev
            .format(key.expose_secret(), &settings.plain_params()?)
            .with_context(|| format!("Error formatting {:?}", args.device))?,
    }
    Ok(())
}

fn add_key(args: &AddKeyArguments, settings: &Settings) -> Result<()> {
    let key = read_key(&args.existing.key_file)?;
    let new_key = read_key(&args.new_key_file)?;
    let mut dev = load_device(&args.existing.device, settings)?;
    let keyslot = dev
        .add_key(args.keyslot, key.expose_secret(), new_key.expose_secret())
        .context("Error adding key")?;
    println!("Added key to keyslot {}", keyslot);
    Ok(())
}

fn remove_key(args: &KeyArguments, settings: &Settings) -> Result<()> {
    let key = read_key(&args.key_file)?;
    let mut dev = load_device(&args.device, settings)?;
    let keyslot = dev.del_key(key.expose_secret()).context("Error removing key")?;
    println!("Removed keyslot {}", keyslot);
    Ok(())
}

fn open(args: &OpenArguments, settings: &Settings) -> Result<()> {
    let key = read_key(&args.key.key_file)?;
    let mut dev = load_device(&args.key.device, settings)?;
    let mut flags = ActivateFlags::empty();
    flags.set(ActivateFlags::READONLY, args.readonly);
    flags.set(ActivateFlags::ALLOW_DISCARDS, args.allow_discards);
    dev.activate(&args.name, key.expose_secret(), flags)
        .with_context(|| format!("Error activating {}", args.name))?;
    Ok(())
}

fn close(args: &MappingArguments, settings: &Settings) -> Result<()> {
    let mut dev = load_device(&args.device, settings)?;
    dev.deactivate(&args.name)
        .with_context(|| format!("Error deactivating {}", args.name))
}

fn status(args: &MappingArguments, settings: &Settings) -> Result<()> {
    let mut dev = load_device(&args.device, settings)?;
    let uuid = dev.uuid().context("Error reading header UUID")?;
    let active = dev
        .active_device(&args.name)
        .with_context(|| format!("Error querying mapping {}", args.name))?;
    let report = StatusReport {
        device: dev.path().display().to_string(),
        uuid: uuid.map(|u| u.to_string()),
        mapping: args.name.clone(),
        offset: active.offset,
        iv_offset: active.iv_offset,
        size: active.size,
        readonly: active.flags.contains(ActivateFlags::READONLY),
    };
    print!("{}", serde_yaml::to_string(&report)?);
    Ok(())
}

fn benchmark(args: &BenchmarkArguments, settings: &Settings) -> Result<()> {
    let params = settings.params()?;
    let mut dev = open_device(&args.device, settings)?;
    let result = dev
        .benchmark(&params, args.iv_size, args.buffer_size)
        .context("Error benchmarking cipher")?;
    let report = CipherReport {
        cipher: format!("{}-{}", params.cipher, params.mode),
        key_size_bits: params.volume_key_size * 8,
        encryption_mib_s: result.encryption_mbs,
        decryption_mib_s: result.decryption_mbs,
    };
    print!("{}", serde_yaml::to_string(&report)?);
    Ok(())
}

fn benchmark_pbkdf(args: &BenchmarkPbkdfArguments, settings: &Settings) -> Result<()> {
    let params = PbkdfParams {
        kdf: args.kdf.into(),
        hash: settings.hash.clone(),
        time: Duration::from_millis(args.time_ms),
        ..Default::default()
    };
    let mut dev = open_device(&args.device, settings)?;
    let result = dev
        .benchmark_pbkdf(
            &params,
            BENCHMARK_PASSWORD,
            BENCHMARK_SALT,
            settings.params()?.volume_key_size,
        )
        .context("Error benchmarking key derivation")?;
    let report = PbkdfReport {
        iterations: result.iterations,
        max_memory_kb: result.max_memory_kb,
        parallel_threads: result.parallel_threads,
    };
    print!("{}", serde_yaml::to_string(&report)?);
    Ok(())
}

fn main() -> Result<()> {
    pretty_env_logger::init();

    let cli = Cli::parse();
    let settings = Settings::load()?;
    log::trace!("Settings: {:?}", settings);
    set_debug_level(settings.debug_level.into());

    match cli.command {
        Commands::Format(args) => format(&args, &settings),
        Commands::AddKey(args) => add_key(&args, &settings),
        Commands::RemoveKey(args) => remove_key(&args, &settings),
        Commands::Open(args) => open(&args, &settings),
        Commands::Close(args) => close(&args, &settings),
        Commands::Status(args) => status(&args, &settings),
        Commands::Benchmark(args) => benchmark(&args, &settings),
        Commands::BenchmarkPbkdf(args) => benchmark_pbkdf(&args, &settings),
    }
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_format() {
        let cli = Cli::try_parse_from([
            "cryptlog-tool",
            "format",
            "/tmp/disk.img",
            "--key-file",
            "/tmp/key",
            "--format",
            "plain",
        ])
        .unwrap();
        match cli.command {
            Commands::Format(args) => {
                assert_eq!(args.device, PathBuf::from("/tmp/disk.img"));
                assert!(matches!(args.format, FormatType::Plain));
                assert!(!args.defaults);
            }
            _ => panic!("Parsed the wrong subcommand"),
        }
    }

    #[test]
    fn test_parse_open() {
        let cli = Cli::try_parse_from([
            "cryptlog-tool",
            "open",
            "/tmp/disk.img",
            "secret",
            "--key-file",
            "/tmp/key",
            "--readonly",
        ])
        .unwrap();
        match cli.command {
            Commands::Open(args) => {
                assert_eq!(args.name, "secret");
                assert!(args.readonly);
                assert!(!args.allow_discards);
            }
            _ => panic!("Parsed the wrong subcommand"),
        }
    }

    #[test]
    fn test_parse_add_key_without_new_key_fails() {
        assert!(Cli::try_parse_from([
            "cryptlog-tool",
            "add-key",
            "/tmp/disk.img",
            "--key-file",
            "/tmp/key",
        ])
        .is_err());
    }

    #[test]
    fn test_read_key() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"correct horse").unwrap();
        let key = read_key(file.path()).unwrap();
        assert_eq!(key.expose_secret().as_slice(), b"correct horse");

        let empty = tempfile::NamedTempFile::new().unwrap();
        assert!(read_key(empty.path()).is_err());
    }
}
