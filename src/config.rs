use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

#[derive(Parser, Debug, Default)]
#[command(name = "eip1193_gateway")]
#[command(about = "EIP-1193 request adapter over Ethereum JSON-RPC nodes", long_about = None)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, value_name = "FILE", env = "GATEWAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to listen on, overrides the file
    #[arg(short, long, env = "GATEWAY_LISTEN")]
    pub listen: Option<String>,

    /// Upstream node as URL or NAME=URL, may be repeated
    #[arg(short, long = "upstream", value_name = "[NAME=]URL")]
    pub upstreams: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen: String,
    pub adapter: AdapterConfig,
    pub cache: CacheConfig,
    pub health: HealthConfig,
    pub upstreams: Vec<UpstreamConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_string(),
            adapter: AdapterConfig::default(),
            cache: CacheConfig::default(),
            health: HealthConfig::default(),
            upstreams: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Serve `eth_getCode` by returning the block named by `params[0]`
    /// instead of the account bytecode.
    pub legacy_get_code: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_ms: u64,
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: 2_000,
            capacity: 1_000,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub interval_secs: u64,
    pub max_consecutive_failures: usize,
    pub cooldown_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval_secs: 10,
            max_consecutive_failures: 3,
            cooldown_secs: 60,
            request_timeout_secs: 5,
        }
    }
}

impl HealthConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UpstreamConfig {
    pub name: String,
    pub url: String,
}

impl Config {
    /// Reads the file named on the command line, if any, then applies CLI overrides.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn apply_cli(&mut self, cli: &Cli) {
        if let Some(listen) = &cli.listen {
            self.listen = listen.clone();
        }
        for arg in &cli.upstreams {
            let named = arg.split_once('=').filter(|(name, _)| !name.contains("://"));
            let upstream = match named {
                Some((name, url)) => UpstreamConfig {
                    name: name.to_string(),
                    url: url.to_string(),
                },
                None => UpstreamConfig {
                    name: format!("Node {}", self.upstreams.len() + 1),
                    url: arg.clone(),
                },
            };
            self.upstreams.push(upstream);
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.upstreams.is_empty() {
            return Err(ConfigError::Validation(
                "at least one upstream node is required".to_string(),
            ));
        }
        for upstream in &self.upstreams {
            if !upstream.url.starts_with("http://") && !upstream.url.starts_with("https://") {
                return Err(ConfigError::Validation(format!(
                    "upstream {} has a non-HTTP url: {}",
                    upstream.name, upstream.url
                )));
            }
        }
        if self.health.max_consecutive_failures == 0 {
            return Err(ConfigError::Validation(
                "health.max_consecutive_failures must be at least 1".to_string(),
            ));
        }
        if self.health.interval_secs == 0 {
            return Err(ConfigError::Validation(
                "health.interval_secs must be at least 1".to_string(),
            ));
        }
        if self.cache.capacity == 0 {
            return Err(ConfigError::Validation(
                "cache.capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
