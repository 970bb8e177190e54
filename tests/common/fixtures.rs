use std::path::{Path, PathBuf};

use hijackfinder::config::{DnsConfig, DohServerConfig, HttpConfig};
use hijackfinder::dns::DnsServerPool;
use hijackfinder::fingerprint::FingerprintCatalog;
use hijackfinder::rdap::BootstrapCache;

pub fn fixture_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(relative)
}

pub fn load_fixture(relative: &str) -> String {
    std::fs::read_to_string(fixture_path(relative))
        .unwrap_or_else(|_| panic!("Failed to load fixture: {}", relative))
}

/// The fingerprint catalog used by the end-to-end tests
pub fn fixture_catalog() -> FingerprintCatalog {
    FingerprintCatalog::load(&fixture_path("fingerprints.json"))
        .unwrap_or_else(|e| panic!("Failed to load fixture catalog: {:#}", e))
}

/// Bootstrap registry that routes the given TLDs to `base_url`
pub fn bootstrap_for(tlds: &[&str], base_url: &str) -> BootstrapCache {
    let document = serde_json::json!({
        "version": "1.0",
        "publication": "2026-01-01T00:00:00Z",
        "description": "test registry",
        "services": [[tlds, [format!("{}/", base_url.trim_end_matches('/'))]]]
    });
    BootstrapCache::from_json(&document.to_string())
        .unwrap_or_else(|e| panic!("Failed to build bootstrap: {:#}", e))
}

/// Write a wordlist file with one subdomain per line
pub fn write_wordlist(dir: &Path, subdomains: &[&str]) -> PathBuf {
    let path = dir.join("subdomains.txt");
    std::fs::write(&path, subdomains.join("\n")).unwrap();
    path
}

/// HTTP settings for tests, optionally pointing fingerprint probes at `fingerprint_endpoint`
pub fn http_config(fingerprint_endpoint: Option<String>) -> HttpConfig {
    HttpConfig {
        user_agent: "hijackfinder-tests".to_string(),
        request_timeout_secs: 5,
        max_redirects: 2,
        fingerprint_endpoint,
    }
}

/// Resolver pool that only queries the given DoH JSON endpoints
pub fn doh_pool(urls: &[String]) -> DnsServerPool {
    let dns = DnsConfig {
        doh_servers: urls
            .iter()
            .enumerate()
            .map(|(i, url)| DohServerConfig {
                name: format!("Mock DoH {}", i + 1),
                url: url.clone(),
                timeout_secs: 2,
            })
            .collect(),
        dns_servers: Vec::new(),
        use_system_resolver: false,
    };
    DnsServerPool::from_config(&dns, &http_config(None))
        .unwrap_or_else(|e| panic!("Failed to build DoH pool: {:#}", e))
}
