use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{de, Deserialize, Deserializer, Serialize};

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Parse a timeout like "30s", "2m", or a bare number of seconds.
pub fn parse_timeout(s: &str) -> Result<Duration> {
    let s = s.trim().to_lowercase();
    let (num, multiplier) = if let Some(num) = s.strip_suffix('m') {
        (num, 60)
    } else if let Some(num) = s.strip_suffix('s') {
        (num, 1)
    } else {
        (s.as_str(), 1)
    };

    let num: u64 = num
        .trim()
        .parse()
        .with_context(|| format!("Invalid timeout: {s:?}"))?;
    let secs = num.checked_mul(multiplier).context("Timeout is too large")?;
    Ok(Duration::from_secs(secs))
}

fn deserialize_timeout<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Secs(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Secs(secs) => Ok(Duration::from_secs(secs)),
        Raw::Text(s) => parse_timeout(&s).map_err(de::Error::custom),
    }
}

fn serialize_timeout<S>(timeout: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&format!("{}s", timeout.as_secs()))
}

/// HTTP client settings shared by every backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout.
    #[serde(
        deserialize_with = "deserialize_timeout",
        serialize_with = "serialize_timeout"
    )]
    pub timeout: Duration,

    /// Accept invalid TLS certificates. Management controllers commonly ship
    /// with self-signed certificates.
    pub insecure: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            insecure: false,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the credential store. If relative, resolved from the config
    /// file location. Defaults to `<data dir>/hpecli/store.json`.
    pub store_path: Option<PathBuf>,

    /// Default log filter when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub http: HttpConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: None,
            log_level: default_log_level(),
            http: HttpConfig::default(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Resolve the store path against the directory holding the config file.
    pub fn resolve_store_path(&self, config_dir: &Path) -> PathBuf {
        match &self.store_path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => config_dir.join(path),
            None => default_store_path(),
        }
    }
}

/// Loaded configuration with resolved paths.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub store_path: PathBuf,
    pub log_level: String,
    pub http: HttpConfig,
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./hpecli.toml` if it exists in the current directory
/// 2. `~/.config/hpecli/hpecli.toml` (XDG config directory)
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from("hpecli.toml");
    if local_config.exists() {
        return local_config;
    }

    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("hpecli").join("hpecli.toml");
    }

    local_config
}

/// Returns the default credential store path.
pub fn default_store_path() -> PathBuf {
    match dirs::data_dir() {
        Some(data_dir) => data_dir.join("hpecli").join("store.json"),
        None => PathBuf::from(".hpecli").join("store.json"),
    }
}

impl ResolvedConfig {
    /// Load and resolve config from a file path.
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_path = config_path
            .canonicalize()
            .with_context(|| format!("Config file not found: {}", config_path.display()))?;

        let config_dir = config_path
            .parent()
            .context("Config file has no parent directory")?;

        let config = Config::load(&config_path)?;
        let store_path = config.resolve_store_path(config_dir);

        Ok(Self {
            store_path,
            log_level: config.log_level,
            http: config.http,
        })
    }

    /// Load config, falling back to defaults if the file doesn't exist.
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            Self::load(config_path)
        } else {
            let config = Config::default();
            Ok(Self {
                store_path: default_store_path(),
                log_level: config.log_level,
                http: config.http,
            })
        }
    }
}
