use anyhow::Result;
use hickory_resolver::config::{NameServerConfig, Protocol, ResolverConfig, ResolverOpts};
use hickory_resolver::proto::rr::{RData, RecordType};
use hickory_resolver::TokioAsyncResolver;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info};

use crate::classifier::CnameLookup;
use crate::config::{DnsConfig, DnsServerConfig, DohServerConfig, HttpConfig};

/// DNS record type number for CNAME in DoH JSON answers
const CNAME_TYPE: u64 = 5;

struct NamedResolver {
    name: String,
    resolver: TokioAsyncResolver,
}

/// Rotating pool of DNS backends.
///
/// Each subdomain gets exactly one query against the next backend in rotation:
/// DoH servers when any are configured, otherwise plain DNS servers, otherwise
/// the system resolver. Failures are not retried.
pub struct DnsServerPool {
    doh_servers: Vec<DohServerConfig>,
    dns_resolvers: Vec<NamedResolver>,
    system_resolver: Option<TokioAsyncResolver>,
    current_doh_index: AtomicUsize,
    current_dns_index: AtomicUsize,
    client: reqwest::Client,
}

impl DnsServerPool {
    /// Create a DNS server pool from configuration
    pub fn from_config(dns: &DnsConfig, http: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(http.request_timeout_secs))
            .user_agent(&http.user_agent)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client for DoH: {}", e))?;

        let mut dns_resolvers = Vec::with_capacity(dns.dns_servers.len());
        for server in &dns.dns_servers {
            dns_resolvers.push(NamedResolver {
                name: server.name.clone(),
                resolver: create_dns_resolver(server)?,
            });
        }

        let system_resolver = if dns.doh_servers.is_empty() && dns_resolvers.is_empty() && dns.use_system_resolver {
            Some(TokioAsyncResolver::tokio_from_system_conf()?)
        } else {
            None
        };

        Ok(Self {
            doh_servers: dns.doh_servers.clone(),
            dns_resolvers,
            system_resolver,
            current_doh_index: AtomicUsize::new(0),
            current_dns_index: AtomicUsize::new(0),
            client,
        })
    }

    /// Human-readable description of the active backend
    pub fn describe(&self) -> String {
        if !self.doh_servers.is_empty() {
            let names: Vec<&str> = self.doh_servers.iter().map(|s| s.name.as_str()).collect();
            format!("DoH ({})", names.join(", "))
        } else if !self.dns_resolvers.is_empty() {
            let names: Vec<&str> = self.dns_resolvers.iter().map(|r| r.name.as_str()).collect();
            format!("DNS ({})", names.join(", "))
        } else if self.system_resolver.is_some() {
            "system resolver".to_string()
        } else {
            "none".to_string()
        }
    }

    fn next_doh_server(&self) -> &DohServerConfig {
        let index = self.current_doh_index.fetch_add(1, Ordering::Relaxed) % self.doh_servers.len();
        &self.doh_servers[index]
    }

    fn next_dns_resolver(&self) -> &NamedResolver {
        let index = self.current_dns_index.fetch_add(1, Ordering::Relaxed) % self.dns_resolvers.len();
        &self.dns_resolvers[index]
    }

    /// Perform DNS over HTTPS lookup for CNAME records
    async fn doh_cname_lookup(&self, domain: &str, server: &DohServerConfig) -> Result<Vec<String>> {
        debug!("DoH CNAME lookup for {} using {}", domain, server.name);

        let query_params = [("name", domain), ("type", "CNAME")];

        let response = self
            .client
            .get(&server.url)
            .query(&query_params)
            .header("Accept", "application/dns-json")
            .timeout(Duration::from_secs(server.timeout_secs))
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;

        let mut records = Vec::new();

        if let Some(answers) = response["Answer"].as_array() {
            for answer in answers {
                if answer["type"].as_u64() == Some(CNAME_TYPE) {
                    if let Some(data) = answer["data"].as_str() {
                        records.push(clean_target(data));
                    }
                }
            }
        }

        debug!("DoH found {} CNAME records for {} via {}", records.len(), domain, server.name);
        Ok(records)
    }

    /// Resolve the CNAME target of `domain`.
    ///
    /// Any failure (NXDOMAIN, timeout, no CNAME record, malformed answer) is
    /// reported as [`CnameLookup::Absent`]. When several records come back the
    /// last one wins.
    pub async fn resolve_cname(&self, domain: &str) -> CnameLookup {
        let result = if !self.doh_servers.is_empty() {
            let server = self.next_doh_server();
            self.doh_cname_lookup(domain, server).await
        } else if !self.dns_resolvers.is_empty() {
            let named = self.next_dns_resolver();
            debug!("DNS CNAME lookup for {} using {}", domain, named.name);
            hickory_cname_lookup(&named.resolver, domain).await
        } else if let Some(resolver) = &self.system_resolver {
            hickory_cname_lookup(resolver, domain).await
        } else {
            Ok(Vec::new())
        };

        match result {
            Ok(records) => match records.into_iter().filter(|r| !r.is_empty()).last() {
                Some(target) => CnameLookup::Found(target),
                None => CnameLookup::Absent,
            },
            Err(e) => {
                debug!("CNAME lookup failed for {}: {}", domain, e);
                CnameLookup::Absent
            }
        }
    }

    pub fn log_backend(&self) {
        info!("Resolving CNAMEs via {}", self.describe());
    }
}

/// Create a UDP resolver for one configured server
fn create_dns_resolver(server: &DnsServerConfig) -> Result<TokioAsyncResolver> {
    let socket_addr = server.address.parse().map_err(|e| {
        anyhow::anyhow!(
            "Invalid DNS server address '{}' for server '{}': {}",
            server.address,
            server.name,
            e
        )
    })?;

    let mut config = ResolverConfig::new();
    config.add_name_server(NameServerConfig::new(socket_addr, Protocol::Udp));

    let mut opts = ResolverOpts::default();
    opts.timeout = Duration::from_secs(server.timeout_secs);
    opts.attempts = 1;
    opts.edns0 = true;
    opts.use_hosts_file = false;
    opts.validate = false;

    Ok(TokioAsyncResolver::tokio(config, opts))
}

async fn hickory_cname_lookup(resolver: &TokioAsyncResolver, domain: &str) -> Result<Vec<String>> {
    let lookup = resolver.lookup(domain, RecordType::CNAME).await?;
    let records = lookup
        .iter()
        .filter_map(|rdata| match rdata {
            RData::CNAME(cname) => Some(clean_target(&cname.0.to_utf8())),
            _ => None,
        })
        .collect();
    Ok(records)
}

/// Strip quotes and the trailing root dot from a CNAME target
fn clean_target(data: &str) -> String {
    data.trim().trim_matches('"').trim_end_matches('.').to_string()
}
