//! Known-service fingerprint catalog and the HTTPS probe that tests it.
//!
//! The catalog file is a JSON array of `{"service": "...", "fingerprint": ["..."]}`
//! objects. A service applies to a CNAME when its name equals the CNAME's apex
//! domain or the apex's leftmost label, so both `"shopify"` and
//! `"shopify.com"` match `shop.shopify.com`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::HttpConfig;
use crate::domain_utils;

/// A takeover-able service and the substrings its unclaimed endpoint serves
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintEntry {
    pub service: String,
    pub fingerprint: Vec<String>,
}

impl FingerprintEntry {
    /// True when any fingerprint substring occurs in `body`
    pub fn matches_body(&self, body: &str) -> bool {
        self.fingerprint
            .iter()
            .any(|needle| !needle.is_empty() && body.contains(needle.as_str()))
    }

    fn applies_to(&self, apex: &str) -> bool {
        let service = self.service.trim();
        service.eq_ignore_ascii_case(apex)
            || service.eq_ignore_ascii_case(&domain_utils::apex_label(apex))
    }
}

/// Read-only catalog of fingerprint entries, loaded once at startup
#[derive(Debug, Clone, Default)]
pub struct FingerprintCatalog {
    entries: Vec<FingerprintEntry>,
}

impl FingerprintCatalog {
    pub fn new(entries: Vec<FingerprintEntry>) -> Self {
        Self { entries }
    }

    /// Load a catalog from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fingerprint file: {}", path.display()))?;
        let catalog = Self::from_json(&content)
            .with_context(|| format!("Failed to parse fingerprint file: {}", path.display()))?;
        info!("Loaded {} service fingerprints from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    /// Parse a catalog, dropping entries that could never match
    pub fn from_json(content: &str) -> Result<Self> {
        let raw: Vec<FingerprintEntry> =
            serde_json::from_str(content).context("Fingerprint JSON must be an array of {service, fingerprint} objects")?;

        let entries = raw
            .into_iter()
            .filter(|entry| {
                let usable = !entry.service.trim().is_empty()
                    && entry.fingerprint.iter().any(|f| !f.is_empty());
                if !usable {
                    warn!("Skipping fingerprint entry '{}': empty service name or fingerprint list", entry.service);
                }
                usable
            })
            .collect();

        Ok(Self { entries })
    }

    /// First cataloged entry whose service name matches the apex domain
    pub fn match_service(&self, apex: &str) -> Option<&FingerprintEntry> {
        self.entries.iter().find(|entry| entry.applies_to(apex))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Fetches a CNAME target over HTTPS and tests the body against a service's fingerprints
pub struct FingerprintProber {
    client: reqwest::Client,
    /// Fixed URL every probe is sent to instead of `https://{target}`
    endpoint_override: Option<String>,
}

impl FingerprintProber {
    pub fn from_config(config: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .context("Failed to create HTTP client for fingerprint probes")?;

        if let Some(endpoint) = &config.fingerprint_endpoint {
            debug!("Fingerprint probes redirected to {}", endpoint);
        }

        Ok(Self {
            client,
            endpoint_override: config.fingerprint_endpoint.clone(),
        })
    }

    fn probe_url(&self, target: &str) -> String {
        match &self.endpoint_override {
            Some(endpoint) => endpoint.clone(),
            None => format!("https://{}", target),
        }
    }

    /// Probe `target` and report whether its body carries one of `entry`'s fingerprints.
    /// Any transport or decoding error counts as no match.
    pub async fn matches(&self, target: &str, entry: &FingerprintEntry) -> bool {
        let url = self.probe_url(target);

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!("Fingerprint probe to {} failed: {}", url, e);
                return false;
            }
        };

        let status = response.status();
        match response.text().await {
            Ok(body) => {
                let matched = entry.matches_body(&body);
                debug!("Fingerprint probe {} ({}) for {}: matched={}", url, status, entry.service, matched);
                matched
            }
            Err(e) => {
                debug!("Failed to read probe body from {}: {}", url, e);
                false
            }
        }
    }
}
