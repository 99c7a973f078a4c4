//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The storage directory may be overridden with `KEYPROBE_STORAGE_DIR` so a
//! container can mount a volume without editing the TOML.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub verification: VerificationConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

/// HTTP listener settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

/// Where the per-provider JSON documents live
#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_dir")]
    pub dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_storage_dir(),
        }
    }
}

/// Timeouts and background cadence
#[derive(Debug, Deserialize)]
pub struct VerificationConfig {
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Delay before the single re-check of a rate-limited key.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_quota_refresh_interval")]
    pub quota_refresh_interval_secs: u64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            retry_delay_secs: default_retry_delay(),
            refresh_interval_secs: default_refresh_interval(),
            quota_refresh_interval_secs: default_quota_refresh_interval(),
        }
    }
}

impl VerificationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn quota_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.quota_refresh_interval_secs)
    }
}

/// Which providers get a checker
#[derive(Debug, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default = "default_enabled")]
    pub enabled: Vec<String>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
        }
    }
}

fn default_max_connections() -> usize {
    256
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from("storage")
}

fn default_timeout() -> u64 {
    10
}

fn default_retry_delay() -> u64 {
    600
}

fn default_refresh_interval() -> u64 {
    24 * 60 * 60
}

fn default_quota_refresh_interval() -> u64 {
    7 * 24 * 60 * 60
}

fn default_enabled() -> Vec<String> {
    adapters::PROVIDER_NAMES
        .iter()
        .map(|name| name.to_string())
        .collect()
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if let Ok(dir) = std::env::var("KEYPROBE_STORAGE_DIR")
            && !dir.trim().is_empty()
        {
            config.storage.dir = PathBuf::from(dir.trim());
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> common::Result<()> {
        if self.server.max_connections == 0 {
            return Err(common::Error::invalid(
                "server.max_connections",
                "must be greater than 0",
            ));
        }

        let v = &self.verification;
        for (field, value) in [
            ("verification.timeout_secs", v.timeout_secs),
            ("verification.retry_delay_secs", v.retry_delay_secs),
            ("verification.refresh_interval_secs", v.refresh_interval_secs),
            (
                "verification.quota_refresh_interval_secs",
                v.quota_refresh_interval_secs,
            ),
        ] {
            if value == 0 {
                return Err(common::Error::invalid(field, "must be greater than 0"));
            }
        }

        if self.providers.enabled.is_empty() {
            return Err(common::Error::Config(
                "providers.enabled must name at least one provider".into(),
            ));
        }
        for name in &self.providers.enabled {
            if !adapters::PROVIDER_NAMES.contains(&name.as_str()) {
                return Err(common::Error::Config(format!(
                    "unknown provider `{name}` in providers.enabled (supported: {})",
                    adapters::PROVIDER_NAMES.join(", ")
                )));
            }
        }

        Ok(())
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("keyprobe.toml")
    }
}
