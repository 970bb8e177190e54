//! Per-subdomain scanning pipeline
//!
//! A [`Scanner`] owns the long-lived collaborators (DNS pool, RDAP oracle,
//! fingerprint prober, service catalog). All of them are built before the
//! first worker runs and are only read afterwards, so one scanner is shared
//! by every concurrent task.

use anyhow::{Context, Result};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::classifier::{self, ClassificationResult, CnameLookup, RegistrationStatus, TakeoverSignals};
use crate::config::AppConfig;
use crate::dns::DnsServerPool;
use crate::domain_utils;
use crate::fingerprint::{FingerprintCatalog, FingerprintEntry, FingerprintProber};
use crate::rdap::{BootstrapCache, RdapOracle};

/// Reasons a subdomain is dropped without a result row
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("empty subdomain")]
    EmptySubdomain,

    #[error("worker for {subdomain} panicked: {message}")]
    Panicked { subdomain: String, message: String },
}

impl ScanError {
    /// Short category used in logs
    pub fn category(&self) -> &'static str {
        match self {
            ScanError::EmptySubdomain => "empty_subdomain",
            ScanError::Panicked { .. } => "panic",
        }
    }
}

pub struct Scanner {
    resolver: DnsServerPool,
    oracle: RdapOracle,
    prober: FingerprintProber,
    catalog: Arc<FingerprintCatalog>,
}

impl Scanner {
    pub fn new(
        resolver: DnsServerPool,
        oracle: RdapOracle,
        prober: FingerprintProber,
        catalog: Arc<FingerprintCatalog>,
    ) -> Self {
        Self {
            resolver,
            oracle,
            prober,
            catalog,
        }
    }

    /// Build every collaborator from configuration. The RDAP bootstrap
    /// registry is loaded here, once, before any subdomain is processed.
    pub async fn from_config(config: &AppConfig, catalog: FingerprintCatalog) -> Result<Self> {
        let resolver = DnsServerPool::from_config(&config.dns, &config.http)
            .context("Failed to initialize DNS resolvers")?;
        resolver.log_backend();

        let client = RdapOracle::build_client(&config.http, &config.rdap)?;
        let bootstrap = BootstrapCache::initialize(&config.rdap, &client)
            .await
            .context("Failed to initialize RDAP bootstrap registry")?;
        let oracle = RdapOracle::new(client, Arc::new(bootstrap), config.rdap.requests_per_second);

        let prober = FingerprintProber::from_config(&config.http)?;

        Ok(Self::new(resolver, oracle, prober, Arc::new(catalog)))
    }

    /// Resolve and classify one wordlist entry.
    ///
    /// The result keeps the entry as given (trimmed); DNS is queried with the
    /// normalised name. An entry that is not a valid hostname is not sent to
    /// the resolver and is classified as having no CNAME.
    pub async fn scan(&self, subdomain: &str) -> Result<ClassificationResult, ScanError> {
        let subdomain = subdomain.trim();
        if subdomain.is_empty() {
            return Err(ScanError::EmptySubdomain);
        }

        let query = domain_utils::normalize_hostname(subdomain);
        let lookup = if domain_utils::is_valid_hostname(&query) {
            self.resolver.resolve_cname(&query).await
        } else {
            debug!("'{}' is not a valid hostname, not resolving", subdomain);
            CnameLookup::Absent
        };

        Ok(classifier::classify(subdomain, lookup, &self.catalog, self).await)
    }
}

impl TakeoverSignals for Scanner {
    async fn fingerprint_matches(&self, cname: &str, entry: &FingerprintEntry) -> bool {
        self.prober.matches(cname, entry).await
    }

    async fn registration_status(&self, apex: &str) -> RegistrationStatus {
        self.oracle.is_registered(apex).await
    }
}
