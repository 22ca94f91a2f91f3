//! Node configuration loading and management.

use async_trait::async_trait;
use chainroute_core::{ChainProfile, EnginePolicy};
use chainroute_routing::{default_rates_with, ExchangeRateFeed, RoutingError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Full configuration for the routing node.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NodeConfig {
    /// API server settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Routing and lifecycle policy.
    #[serde(default)]
    pub policy: EnginePolicy,

    /// Exchange rate settings.
    #[serde(default)]
    pub rates: RatesConfig,

    /// Simulated settlement backends.
    #[serde(default)]
    pub backends: BackendsConfig,

    /// Chain profiles. Empty means the built-in set.
    #[serde(default)]
    pub chains: Vec<ChainProfile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API listen address.
    #[serde(default = "default_api_addr")]
    pub listen_addr: String,
    /// API port.
    #[serde(default = "default_api_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Whether plans and status changes are written to RocksDB.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Path to the data directory.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatesConfig {
    /// Seconds between rate refreshes. `0` disables the refresh task.
    #[serde(default = "default_refresh_secs")]
    pub refresh_interval_secs: u64,
    /// USD rates applied over the built-in table.
    #[serde(default)]
    pub usd: HashMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendsConfig {
    #[serde(default)]
    pub mixer_latency_ms: u64,
    #[serde(default = "default_executor_latency_ms")]
    pub executor_latency_ms: u64,
    #[serde(default = "default_confirmations")]
    pub confirmations: u32,
}

// Default value functions
fn default_api_addr() -> String {
    "127.0.0.1".into()
}
fn default_api_port() -> u16 {
    8470
}
fn default_true() -> bool {
    true
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}
fn default_refresh_secs() -> u64 {
    60
}
fn default_executor_latency_ms() -> u64 {
    250
}
fn default_confirmations() -> u32 {
    1
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_api_addr(),
            port: default_api_port(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            data_dir: default_data_dir(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_secs(),
            usd: HashMap::new(),
        }
    }
}

impl Default for BackendsConfig {
    fn default() -> Self {
        Self {
            mixer_latency_ms: 0,
            executor_latency_ms: default_executor_latency_ms(),
            confirmations: default_confirmations(),
        }
    }
}

impl NodeConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: NodeConfig = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the current config to a TOML file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn api_addr(&self) -> String {
        format!("{}:{}", self.api.listen_addr, self.api.port)
    }
}

/// Rate feed that re-reads `[rates.usd]` from the config file on every
/// pull, so operators can reprice a running node by editing the file.
pub struct ConfigRateFeed {
    path: PathBuf,
}

impl ConfigRateFeed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ExchangeRateFeed for ConfigRateFeed {
    async fn get_rates(&self) -> Result<HashMap<String, f64>, RoutingError> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| RoutingError::RateFeed(format!("{}: {}", self.path.display(), e)))?;
        let config: NodeConfig = toml::from_str(&contents)
            .map_err(|e| RoutingError::RateFeed(format!("{}: {}", self.path.display(), e)))?;
        Ok(default_rates_with(&config.rates.usd))
    }
}
