use std::path::{Path, PathBuf};
use serde::Deserialize;
use anyhow::{ensure, Context, Result};

/// Environment variable that overrides `access.admin_key`
pub const ADMIN_KEY_ENV: &str = "ADMIN_KEY";

/// Upper bound for `heartbeat_timeout_secs` and `sweep_interval_secs` (one day)
pub const MAX_REGISTRY_INTERVAL_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub access: AccessConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// Servers that have not heartbeated for this long are dropped
    #[serde(default = "default_heartbeat_timeout")]
    pub heartbeat_timeout_secs: u64,
    /// How often timed out servers are swept even if nobody lists them
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccessConfig {
    #[serde(default = "default_ban_list_path")]
    pub ban_list_path: PathBuf,
    #[serde(default = "default_allow_list_path")]
    pub allow_list_path: PathBuf,
    #[serde(default)]
    pub admin_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Take the client address from the last X-Forwarded-For hop. Only
    /// enable this behind a reverse proxy that appends to the header, otherwise
    /// clients can pick their own address.
    #[serde(default = "default_trust_forwarded_for")]
    pub trust_forwarded_for: bool,
}

fn default_heartbeat_timeout() -> u64 {
    65
}

fn default_sweep_interval() -> u64 {
    30
}

fn default_ban_list_path() -> PathBuf {
    PathBuf::from("config/ban_list.txt")
}

fn default_allow_list_path() -> PathBuf {
    PathBuf::from("config/allow_list.txt")
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_trust_forwarded_for() -> bool {
    true
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            heartbeat_timeout_secs: default_heartbeat_timeout(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            ban_list_path: default_ban_list_path(),
            allow_list_path: default_allow_list_path(),
            admin_key: None,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            trust_forwarded_for: default_trust_forwarded_for(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.registry.validate()?;
        Ok(config)
    }
}

impl RegistryConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, secs) in [
            ("heartbeat_timeout_secs", self.heartbeat_timeout_secs),
            ("sweep_interval_secs", self.sweep_interval_secs),
        ] {
            ensure!(
                (1..=MAX_REGISTRY_INTERVAL_SECS).contains(&secs),
                "registry.{} must be between 1 and {}, got {}",
                name,
                MAX_REGISTRY_INTERVAL_SECS,
                secs
            );
        }
        Ok(())
    }

    pub fn heartbeat_timeout(&self) -> Result<chrono::Duration> {
        self.validate()?;
        i64::try_from(self.heartbeat_timeout_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .context("registry.heartbeat_timeout_secs is out of range")
    }

    pub fn sweep_interval(&self) -> Result<std::time::Duration> {
        self.validate()?;
        Ok(std::time::Duration::from_secs(self.sweep_interval_secs))
    }
}

impl AccessConfig {
    /// Admin key from the environment, then the config file.
    pub fn resolve_admin_key(&self, env_value: Option<String>) -> Option<String> {
        env_value
            .filter(|key| !key.is_empty())
            .or_else(|| self.admin_key.clone().filter(|key| !key.is_empty()))
    }
}
