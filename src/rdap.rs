//! Registration oracle backed by RDAP
//!
//! The IANA bootstrap registry maps each TLD to the RDAP service that is
//! authoritative for it. It is fetched (or loaded from a snapshot) once before
//! scanning starts and is shared read-only by every worker afterwards.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::classifier::RegistrationStatus;
use crate::config::{HttpConfig, RdapConfig};
use crate::domain_utils;
use crate::rate_limit::HostRateLimiter;

/// IANA RDAP bootstrap document (RFC 9224)
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BootstrapDocument {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    publication: Option<String>,
    #[serde(default)]
    description: Option<String>,
    services: Vec<(Vec<String>, Vec<String>)>,
}

/// Immutable snapshot of the RDAP bootstrap registry
#[derive(Debug, Clone)]
pub struct BootstrapCache {
    document: BootstrapDocument,
    endpoints: HashMap<String, String>,
}

impl BootstrapCache {
    /// Parse a bootstrap document
    pub fn from_json(content: &str) -> Result<Self> {
        let document: BootstrapDocument =
            serde_json::from_str(content).context("Failed to parse RDAP bootstrap document")?;

        let mut endpoints = HashMap::new();
        for (tlds, urls) in &document.services {
            // RFC 9224: prefer https when several base URLs are listed
            let base = urls
                .iter()
                .find(|u| u.starts_with("https://"))
                .or_else(|| urls.first());

            let Some(base) = base else { continue };
            for tld in tlds {
                endpoints.insert(tld.to_ascii_lowercase(), base.clone());
            }
        }

        if endpoints.is_empty() {
            return Err(anyhow!("RDAP bootstrap document lists no services"));
        }

        Ok(Self { document, endpoints })
    }

    /// Download the bootstrap document
    pub async fn fetch(client: &reqwest::Client, url: &str) -> Result<Self> {
        debug!("Fetching RDAP bootstrap registry from {}", url);
        let body = client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch RDAP bootstrap registry from {}", url))?
            .error_for_status()
            .with_context(|| format!("RDAP bootstrap registry request to {} failed", url))?
            .text()
            .await
            .context("Failed to read RDAP bootstrap registry body")?;

        Self::from_json(&body)
    }

    /// Load a snapshot previously written by [`BootstrapCache::save`]
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read RDAP bootstrap snapshot: {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Invalid RDAP bootstrap snapshot: {}", path.display()))
    }

    /// Write the snapshot to disk
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
        }
        let json = serde_json::to_string_pretty(&self.document)
            .context("Failed to serialize RDAP bootstrap snapshot")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write RDAP bootstrap snapshot: {}", path.display()))
    }

    /// Build the cache once at startup: reuse the configured snapshot when one
    /// exists, otherwise fetch and (if a snapshot path is configured) save it.
    pub async fn initialize(config: &RdapConfig, client: &reqwest::Client) -> Result<Self> {
        if let Some(path) = &config.bootstrap_cache_path {
            if path.exists() {
                let cache = Self::load(path)?;
                info!(
                    "Loaded RDAP bootstrap snapshot ({} TLDs, published {}) from {}",
                    cache.len(),
                    cache.publication().unwrap_or("unknown"),
                    path.display()
                );
                return Ok(cache);
            }
        }

        let cache = Self::fetch(client, &config.bootstrap_url).await?;
        info!(
            "Bootstrapped RDAP registry: {} TLDs, published {}",
            cache.len(),
            cache.publication().unwrap_or("unknown")
        );

        if let Some(path) = &config.bootstrap_cache_path {
            if let Err(e) = cache.save(path) {
                warn!("Could not save RDAP bootstrap snapshot: {:#}", e);
            }
        }

        Ok(cache)
    }

    /// RDAP base URL serving `tld`
    pub fn endpoint_for(&self, tld: &str) -> Option<&str> {
        self.endpoints.get(&tld.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn publication(&self) -> Option<&str> {
        self.document.publication.as_deref()
    }

    /// Number of TLDs covered
    fn len(&self) -> usize {
        self.endpoints.len()
    }
}

/// Everything an RDAP query can end in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RdapOutcome {
    /// The registry returned the domain object
    Found,
    /// The registry answered 404
    NotFound,
    /// No RDAP service is known for the TLD
    NoRegistry,
    /// The registry answered 429
    RateLimited,
    /// Any other HTTP status
    HttpStatus(u16),
    /// Connection, TLS or timeout failure
    Transport(String),
    /// A 200 answer that was not RDAP JSON, or an unusable base URL
    Malformed(String),
}

impl RdapOutcome {
    /// Project to the classifier's binary view. Only `Found` counts as
    /// registered; every other outcome, including errors, is `Unregistered`.
    pub fn status(&self) -> RegistrationStatus {
        match self {
            RdapOutcome::Found => RegistrationStatus::Registered,
            RdapOutcome::NotFound
            | RdapOutcome::NoRegistry
            | RdapOutcome::RateLimited
            | RdapOutcome::HttpStatus(_)
            | RdapOutcome::Transport(_)
            | RdapOutcome::Malformed(_) => RegistrationStatus::Unregistered,
        }
    }

    /// True when the registry gave an actual answer about the domain
    pub fn is_definitive(&self) -> bool {
        matches!(self, RdapOutcome::Found | RdapOutcome::NotFound)
    }
}

impl fmt::Display for RdapOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RdapOutcome::Found => write!(f, "found"),
            RdapOutcome::NotFound => write!(f, "not found"),
            RdapOutcome::NoRegistry => write!(f, "no RDAP registry for TLD"),
            RdapOutcome::RateLimited => write!(f, "rate limited"),
            RdapOutcome::HttpStatus(code) => write!(f, "HTTP {}", code),
            RdapOutcome::Transport(e) => write!(f, "transport error: {}", e),
            RdapOutcome::Malformed(e) => write!(f, "malformed response: {}", e),
        }
    }
}

/// Answers "is this apex domain registered?" via RDAP
pub struct RdapOracle {
    client: reqwest::Client,
    bootstrap: Arc<BootstrapCache>,
    limiter: HostRateLimiter,
}

impl RdapOracle {
    pub fn new(client: reqwest::Client, bootstrap: Arc<BootstrapCache>, requests_per_second: u32) -> Self {
        Self {
            client,
            bootstrap,
            limiter: HostRateLimiter::new(requests_per_second),
        }
    }

    /// HTTP client used for RDAP queries and the bootstrap fetch
    pub fn build_client(http: &HttpConfig, rdap: &RdapConfig) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(rdap.timeout_secs))
            .user_agent(&http.user_agent)
            .build()
            .context("Failed to create HTTP client for RDAP")
    }

    /// Query the registry for the apex (last two labels) of `domain`
    pub async fn lookup(&self, domain: &str) -> RdapOutcome {
        let apex = domain_utils::extract_apex(domain);

        let Some(tld) = domain_utils::tld(&apex) else {
            return RdapOutcome::NoRegistry;
        };
        let Some(base) = self.bootstrap.endpoint_for(&tld) else {
            debug!("No RDAP service listed for .{} ({})", tld, apex);
            return RdapOutcome::NoRegistry;
        };

        let url = match domain_url(base, &apex) {
            Ok(url) => url,
            Err(e) => return RdapOutcome::Malformed(e.to_string()),
        };

        if let Some(host) = url.host_str() {
            self.limiter.acquire(host).await;
        }

        let response = match self
            .client
            .get(url.clone())
            .header("Accept", "application/rdap+json, application/json")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return RdapOutcome::Transport(e.to_string()),
        };

        match response.status().as_u16() {
            200 => match response.json::<serde_json::Value>().await {
                Ok(_) => RdapOutcome::Found,
                Err(e) => RdapOutcome::Malformed(e.to_string()),
            },
            404 => RdapOutcome::NotFound,
            429 => RdapOutcome::RateLimited,
            code => RdapOutcome::HttpStatus(code),
        }
    }

    /// Registration status of `domain`'s apex, with all indeterminate outcomes
    /// folded into `Unregistered`
    pub async fn is_registered(&self, domain: &str) -> RegistrationStatus {
        let outcome = self.lookup(domain).await;
        if !outcome.is_definitive() {
            debug!("RDAP lookup for {} was indeterminate ({}), treating as unregistered", domain, outcome);
        }
        outcome.status()
    }
}

fn domain_url(base: &str, apex: &str) -> Result<Url> {
    let base = if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{}/", base)
    };
    let base = Url::parse(&base).with_context(|| format!("Invalid RDAP base URL: {}", base))?;
    base.join(&format!("domain/{}", apex))
        .with_context(|| format!("Cannot build RDAP URL for {}", apex))
}
