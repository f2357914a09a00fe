// src/config.rs
use crate::error::{Result, TrackerError};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3030,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|e| TrackerError::Config(format!("invalid server.host '{}': {}", self.host, e)))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Financialdata,
    AlphaVantage,
    Static,
}

/// Quote provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotesConfig {
    pub provider: ProviderKind,

    /// Overrides the provider's public endpoint.
    pub base_url: Option<String>,

    pub api_key: Option<String>,

    /// Number of daily records shown on the detail view.
    pub history_limit: usize,

    /// JSON file of `{ "SYMBOL": [records...] }` for the static provider.
    pub fixtures: Option<PathBuf>,
}

impl Default for QuotesConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Financialdata,
            base_url: None,
            api_key: None,
            history_limit: 10,
            fixtures: None,
        }
    }
}

impl QuotesConfig {
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| TrackerError::Config("quotes.api_key is required for this provider".into()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Memory,
    Scylla,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub known_node: String,
    pub keyspace: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            known_node: "127.0.0.1:9042".to_string(),
            keyspace: "stock_tracker".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PortfolioConfig {
    /// When false, adding a symbol that is already tracked returns the
    /// existing holding instead of creating a second lot.
    pub allow_duplicate_symbols: bool,

    /// Seconds between background snapshot refreshes. 0 disables the worker.
    pub refresh_interval_secs: u64,
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    pub server: ServerConfig,
    pub quotes: QuotesConfig,
    pub store: StoreConfig,
    pub portfolio: PortfolioConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            server: ServerConfig::default(),
            quotes: QuotesConfig::default(),
            store: StoreConfig::default(),
            portfolio: PortfolioConfig::default(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TrackerError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
            .map_err(|e| TrackerError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load config from a file, or return the defaults if it doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| TrackerError::Config(e.to_string()))
    }
}
