//! Configuration management for hijackfinder
//!
//! Configuration is read from `./config/hijackfinder.toml` (or the path given
//! with `--config`). The embedded template below is the only place defaults
//! exist; when no file is present the template itself is parsed.

use serde::Deserialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration file path relative to working directory
pub const CONFIG_PATH: &str = "./config/hijackfinder.toml";

/// Default configuration file content - this is the ONLY place defaults exist
pub const DEFAULT_CONFIG: &str = include_str!("../config/hijackfinder.toml");

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found at {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] io::Error),

    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid URL in '{field}': {url}")]
    InvalidUrl { field: String, url: String },

    #[error("Invalid address in '{field}': {address} (expected ip:port format)")]
    InvalidAddress { field: String, address: String },

    #[error("Configuration field '{field}' cannot be empty or zero")]
    EmptyRequired { field: String },

    #[error("No resolver configured: add a DoH or DNS server, or enable dns.use_system_resolver")]
    NoResolverConfigured,
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub dns: DnsConfig,
    pub rdap: RdapConfig,
    pub scan: ScanConfig,
}

/// HTTP client configuration shared by the fingerprint probe and the RDAP oracle
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub user_agent: String,
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Send every fingerprint probe to this base URL instead of `https://{cname}`
    /// (a local mirror of a service's unclaimed page)
    #[serde(default)]
    pub fingerprint_endpoint: Option<String>,
}

fn default_max_redirects() -> usize {
    10
}

/// DNS resolution configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DnsConfig {
    #[serde(default)]
    pub doh_servers: Vec<DohServerConfig>,
    #[serde(default)]
    pub dns_servers: Vec<DnsServerConfig>,
    #[serde(default = "default_use_system_resolver")]
    pub use_system_resolver: bool,
}

fn default_use_system_resolver() -> bool {
    true
}

/// DNS-over-HTTPS server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DohServerConfig {
    pub name: String,
    pub url: String,
    pub timeout_secs: u64,
}

/// Traditional DNS server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DnsServerConfig {
    pub name: String,
    pub address: String,
    pub timeout_secs: u64,
}

/// Registration oracle configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RdapConfig {
    pub bootstrap_url: String,
    #[serde(default)]
    pub bootstrap_cache_path: Option<PathBuf>,
    pub timeout_secs: u64,
    #[serde(default)]
    pub requests_per_second: u32,
}

/// Batch scheduling configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    pub batch_size: usize,
    pub concurrency: usize,
}

impl AppConfig {
    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load configuration from `path`, falling back to the embedded template when
    /// the file does not exist. Any other failure is reported.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match Self::load_from_path(path) {
            Err(ConfigError::FileNotFound(_)) => Self::from_toml(DEFAULT_CONFIG),
            other => other,
        }
    }

    /// Parse and validate configuration text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.user_agent.is_empty() {
            return Err(ConfigError::EmptyRequired {
                field: "http.user_agent".to_string(),
            });
        }
        if self.http.request_timeout_secs == 0 {
            return Err(ConfigError::EmptyRequired {
                field: "http.request_timeout_secs".to_string(),
            });
        }

        if let Some(endpoint) = &self.http.fingerprint_endpoint {
            if url::Url::parse(endpoint).is_err() {
                return Err(ConfigError::InvalidUrl {
                    field: "http.fingerprint_endpoint".to_string(),
                    url: endpoint.clone(),
                });
            }
        }

        if self.dns.doh_servers.is_empty()
            && self.dns.dns_servers.is_empty()
            && !self.dns.use_system_resolver
        {
            return Err(ConfigError::NoResolverConfigured);
        }

        for (i, server) in self.dns.doh_servers.iter().enumerate() {
            if !server.url.starts_with("https://") {
                return Err(ConfigError::InvalidUrl {
                    field: format!("dns.doh_servers[{}].url", i),
                    url: server.url.clone(),
                });
            }
        }

        // Basic ip:port check
        for (i, server) in self.dns.dns_servers.iter().enumerate() {
            if !server.address.contains(':') {
                return Err(ConfigError::InvalidAddress {
                    field: format!("dns.dns_servers[{}].address", i),
                    address: server.address.clone(),
                });
            }
        }

        if url::Url::parse(&self.rdap.bootstrap_url).is_err() {
            return Err(ConfigError::InvalidUrl {
                field: "rdap.bootstrap_url".to_string(),
                url: self.rdap.bootstrap_url.clone(),
            });
        }
        if self.rdap.timeout_secs == 0 {
            return Err(ConfigError::EmptyRequired {
                field: "rdap.timeout_secs".to_string(),
            });
        }

        if self.scan.batch_size == 0 {
            return Err(ConfigError::EmptyRequired {
                field: "scan.batch_size".to_string(),
            });
        }
        if self.scan.concurrency == 0 {
            return Err(ConfigError::EmptyRequired {
                field: "scan.concurrency".to_string(),
            });
        }

        Ok(())
    }

    /// Apply command-line overrides for the scan section and re-validate
    pub fn with_scan_overrides(
        mut self,
        batch_size: Option<usize>,
        concurrency: Option<usize>,
    ) -> Result<Self, ConfigError> {
        if let Some(batch_size) = batch_size {
            self.scan.batch_size = batch_size;
        }
        if let Some(concurrency) = concurrency {
            self.scan.concurrency = concurrency;
        }
        self.validate()?;
        Ok(self)
    }

    /// Write the embedded template to `path`, creating parent directories
    pub fn create_default_config_at(path: &Path) -> Result<PathBuf, ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::File::create(path)?;
        file.write_all(DEFAULT_CONFIG.as_bytes())?;

        Ok(path.to_path_buf())
    }
}
