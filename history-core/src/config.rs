use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{HistoryError, Result};
use crate::resilience::RetryPolicy;

/// Overrides `coordinator.password` so the credential can stay out of the
/// config file.
pub const PASSWORD_ENV_VAR: &str = "HISTORY_COORDINATOR_PASSWORD";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub coordinator: CoordinatorConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
    #[serde(default = "default_environment")]
    pub environment: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoordinatorConfig {
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_millis")]
    pub backoff_millis: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    Filesystem,
    Object,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_backend")]
    pub backend: StorageBackendKind,
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub auth_token: Option<String>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            HistoryError::InvalidConfig(format!("cannot read {}: {err}", path.display()))
        })?;
        let mut config: Config = toml::from_str(&raw).map_err(|err| {
            HistoryError::InvalidConfig(format!("cannot parse {}: {err}", path.display()))
        })?;
        if let Ok(password) = std::env::var(PASSWORD_ENV_VAR) {
            config.coordinator.password = password;
        }
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.coordinator.username.trim().is_empty() {
            return Err(HistoryError::InvalidConfig(
                "coordinator.username must not be empty".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(HistoryError::InvalidConfig(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.storage.backend == StorageBackendKind::Object {
            if self.storage.endpoint.as_deref().unwrap_or("").is_empty() {
                return Err(HistoryError::InvalidConfig(
                    "object storage requires storage.endpoint".to_string(),
                ));
            }
            if self.storage.bucket.as_deref().unwrap_or("").is_empty() {
                return Err(HistoryError::InvalidConfig(
                    "object storage requires storage.bucket".to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.backoff_millis))
    }
}

impl CoordinatorConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            environment: default_environment(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_millis: default_backoff_millis(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            root: default_storage_root(),
            endpoint: None,
            bucket: None,
            auth_token: None,
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    "0.0.0.0:8088".parse().expect("static default listen addr")
}

fn default_environment() -> String {
    "default".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_millis() -> u64 {
    100
}

fn default_storage_backend() -> StorageBackendKind {
    StorageBackendKind::Filesystem
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("/var/lib/history-server/queries")
}
