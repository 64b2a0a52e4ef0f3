//! Server configuration.
//!
//! Configuration is layered:
//! - built-in defaults
//! - a TOML file (`NOTIFY_CONFIG`, else the first of the default paths)
//! - environment variables (`NOTIFY_PORT`, `NOTIFY_STORAGE__BACKEND`, ...)

use anyhow::{Context, Result};
use notify_relay_core::RelayConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_VAR: &str = "NOTIFY_CONFIG";

/// Prefix for environment overrides.
const ENV_PREFIX: &str = "NOTIFY";

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Public URLs used in links handed to clients.
    #[serde(default)]
    pub public: PublicConfig,

    /// Web push settings exposed to subscribers.
    #[serde(default)]
    pub web_push: WebPushConfig,

    /// Storage backend.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Resource limits.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Live WebSocket delivery.
    #[serde(default)]
    pub live: LiveConfig,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Public URL configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicConfig {
    /// Base URL of this API, as seen by clients.
    #[serde(default = "default_public_url")]
    pub api_url: String,

    /// Base URL of the subscription web page.
    #[serde(default = "default_public_url")]
    pub web_url: String,
}

impl PublicConfig {
    /// URL that accepts messages for a channel.
    #[must_use]
    pub fn endpoint(&self, channel_id: &str) -> String {
        format!("{}/{}", self.api_url.trim_end_matches('/'), channel_id)
    }

    /// Subscription page for a channel.
    #[must_use]
    pub fn channel_page(&self, channel_id: &str) -> String {
        format!("{}/c/{}", self.web_url.trim_end_matches('/'), channel_id)
    }
}

/// Web push configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebPushConfig {
    /// VAPID public key handed to browsers when they subscribe.
    #[serde(default)]
    pub vapid_public_key: String,
}

/// Storage backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process memory; everything is lost on restart.
    #[default]
    Memory,
    /// Embedded redb database file.
    Redb,
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Which backend to use.
    #[serde(default)]
    pub backend: StorageBackend,

    /// Database file for the redb backend. `~` is expanded.
    #[serde(default = "default_storage_path")]
    pub path: String,
}

/// Resource limits configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum message size in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,

    /// Generated ids tried per registration.
    #[serde(default = "default_max_id_attempts")]
    pub max_id_attempts: usize,
}

/// Live delivery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveConfig {
    /// Enable the live WebSocket endpoint.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Buffered messages per channel before slow followers lag.
    #[serde(default = "default_live_capacity")]
    pub channel_capacity: usize,

    /// Ping interval in milliseconds.
    #[serde(default = "default_ping_interval")]
    pub ping_interval_ms: u64,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable metrics export.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics port.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

// Default value functions
fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_public_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_storage_path() -> String {
    "notify-relay.redb".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_message_size() -> usize {
    64 * 1024 // 64 KB
}

fn default_max_id_attempts() -> usize {
    5
}

fn default_live_capacity() -> usize {
    256
}

fn default_ping_interval() -> u64 {
    30_000 // 30 seconds
}

fn default_metrics_port() -> u16 {
    9090
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public: PublicConfig::default(),
            web_push: WebPushConfig::default(),
            storage: StorageConfig::default(),
            limits: LimitsConfig::default(),
            live: LiveConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for PublicConfig {
    fn default() -> Self {
        Self {
            api_url: default_public_url(),
            web_url: default_public_url(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_storage_path(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_message_size: default_max_message_size(),
            max_id_attempts: default_max_id_attempts(),
        }
    }
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            channel_capacity: default_live_capacity(),
            ping_interval_ms: default_ping_interval(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_metrics_port(),
        }
    }
}

impl Config {
    /// Load configuration from the config file, if any, and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed, or an
    /// environment override has the wrong type.
    pub fn load() -> Result<Self> {
        let base = match Self::find_file() {
            Some(path) => {
                tracing::info!("Loading configuration from {}", path.display());
                Self::from_file(&path)?
            }
            None => Self::default(),
        };

        let settings = ::config::Config::builder()
            .add_source(
                ::config::Config::try_from(&base)
                    .context("Failed to layer configuration file")?,
            )
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to assemble configuration")?;

        settings
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Locate the config file: `NOTIFY_CONFIG`, else the first existing
    /// default path.
    fn find_file() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_VAR) {
            return Some(PathBuf::from(shellexpand::tilde(&path).as_ref()));
        }

        let config_paths = [
            "notify-relay.toml",
            "/etc/notify-relay/notify-relay.toml",
            "~/.config/notify-relay/notify-relay.toml",
        ];

        config_paths
            .iter()
            .map(|path| PathBuf::from(shellexpand::tilde(path).as_ref()))
            .find(|path| path.exists())
    }

    /// Load configuration from a specific TOML file, without environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Get the socket address to bind to.
    ///
    /// # Errors
    ///
    /// Returns an error if host and port do not form a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid bind address {}:{}", self.host, self.port))
    }

    /// Relay settings derived from this configuration.
    #[must_use]
    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            max_id_attempts: self.limits.max_id_attempts,
            live_capacity: self.live.channel_capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert!(config.live.enabled);
        assert!(config.web_push.vapid_public_key.is_empty());
    }

    #[test]
    fn test_config_bind_addr() {
        let config = Config::default();
        let addr = config.bind_addr().unwrap();
        assert_eq!(addr.port(), 8080);

        let config = Config {
            host: "not a host".into(),
            ..Config::default()
        };
        assert!(config.bind_addr().is_err());
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            host = "0.0.0.0"
            port = 9000

            [public]
            api_url = "https://relay.example/api/"

            [storage]
            backend = "redb"
            path = "/var/lib/notify-relay/relay.redb"

            [limits]
            max_message_size = 1024
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9000);
        assert_eq!(config.storage.backend, StorageBackend::Redb);
        assert_eq!(config.limits.max_message_size, 1024);
        assert_eq!(config.limits.max_id_attempts, 5);
        assert_eq!(config.public.web_url, "http://127.0.0.1:8080");
    }

    #[test]
    fn test_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notify-relay.toml");
        std::fs::write(&path, "port = 7000\n[live]\nenabled = false\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.port, 7000);
        assert!(!config.live.enabled);

        assert!(Config::from_file(dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_load_layers_env_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notify-relay.toml");
        std::fs::write(&path, "port = 7100\n[storage]\nbackend = \"redb\"\n").unwrap();

        std::env::set_var(CONFIG_PATH_VAR, &path);
        std::env::set_var("NOTIFY_LIMITS__MAX_MESSAGE_SIZE", "2048");
        let loaded = Config::load();
        std::env::remove_var(CONFIG_PATH_VAR);
        std::env::remove_var("NOTIFY_LIMITS__MAX_MESSAGE_SIZE");

        let config = loaded.unwrap();
        assert_eq!(config.port, 7100);
        assert_eq!(config.storage.backend, StorageBackend::Redb);
        assert_eq!(config.limits.max_message_size, 2048);
        assert_eq!(config.live.channel_capacity, 256);
    }

    #[test]
    fn test_public_links() {
        let public = PublicConfig {
            api_url: "https://relay.example/api/".into(),
            web_url: "https://relay.example".into(),
        };

        assert_eq!(public.endpoint("ab23Cd45"), "https://relay.example/api/ab23Cd45");
        assert_eq!(public.channel_page("ab23Cd45"), "https://relay.example/c/ab23Cd45");
    }

    #[test]
    fn test_relay_config() {
        let mut config = Config::default();
        config.limits.max_id_attempts = 9;
        config.live.channel_capacity = 16;

        let relay = config.relay_config();
        assert_eq!(relay.max_id_attempts, 9);
        assert_eq!(relay.live_capacity, 16);
    }
}
