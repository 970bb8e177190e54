//! Registration oracle behaviour against a mock RDAP service.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::fixtures::bootstrap_for;
use common::wiremock_helpers::mock_rdap_server;
use hijackfinder::classifier::RegistrationStatus;
use hijackfinder::config::RdapConfig;
use hijackfinder::rdap::{BootstrapCache, RdapOracle, RdapOutcome};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn oracle_for(server: &MockServer) -> RdapOracle {
    let bootstrap = bootstrap_for(&["com", "net"], &server.uri());
    RdapOracle::new(reqwest::Client::new(), Arc::new(bootstrap), 0)
}

#[tokio::test]
async fn test_registered_domain_is_found() {
    let server = mock_rdap_server(&[("example.com", 200)], Some(1)).await;
    let oracle = oracle_for(&server).await;

    assert_eq!(oracle.lookup("example.com").await, RdapOutcome::Found);
}

#[tokio::test]
async fn test_lookup_uses_apex_of_deep_name() {
    let server = mock_rdap_server(&[("target.net", 404)], Some(1)).await;
    let oracle = oracle_for(&server).await;

    assert_eq!(
        oracle.is_registered("deep.gone.target.net").await,
        RegistrationStatus::Unregistered
    );
}

#[tokio::test]
async fn test_status_codes_map_to_outcomes() {
    let server = mock_rdap_server(
        &[
            ("found.com", 200),
            ("missing.com", 404),
            ("throttled.com", 429),
            ("broken.com", 500),
        ],
        None,
    )
    .await;
    let oracle = oracle_for(&server).await;

    assert_eq!(oracle.lookup("found.com").await, RdapOutcome::Found);
    assert_eq!(oracle.lookup("missing.com").await, RdapOutcome::NotFound);
    assert_eq!(oracle.lookup("throttled.com").await, RdapOutcome::RateLimited);
    assert_eq!(oracle.lookup("broken.com").await, RdapOutcome::HttpStatus(500));

    assert_eq!(oracle.is_registered("found.com").await, RegistrationStatus::Registered);
    assert_eq!(oracle.is_registered("throttled.com").await, RegistrationStatus::Unregistered);
    assert_eq!(oracle.is_registered("broken.com").await, RegistrationStatus::Unregistered);
}

#[tokio::test]
async fn test_lookups_to_one_registry_are_paced() {
    let server = mock_rdap_server(&[("first.com", 200), ("second.com", 404)], Some(1)).await;
    let bootstrap = bootstrap_for(&["com"], &server.uri());
    let oracle = RdapOracle::new(reqwest::Client::new(), Arc::new(bootstrap), 1);

    let started = Instant::now();
    assert_eq!(oracle.lookup("first.com").await, RdapOutcome::Found);
    assert_eq!(oracle.lookup("second.com").await, RdapOutcome::NotFound);
    assert!(started.elapsed() >= Duration::from_millis(900));
}

#[tokio::test]
async fn test_unlisted_tld_has_no_registry() {
    let server = mock_rdap_server(&[], Some(0)).await;
    let oracle = oracle_for(&server).await;

    assert_eq!(oracle.lookup("something.zz").await, RdapOutcome::NoRegistry);
    assert_eq!(oracle.is_registered("something.zz").await, RegistrationStatus::Unregistered);
}

#[tokio::test]
async fn test_malformed_success_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/domain/garbled.com"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;
    let oracle = oracle_for(&server).await;

    assert!(matches!(oracle.lookup("garbled.com").await, RdapOutcome::Malformed(_)));
}

#[tokio::test]
async fn test_bootstrap_fetch_and_snapshot() {
    let server = MockServer::start().await;
    let document = serde_json::json!({
        "version": "1.0",
        "publication": "2026-02-01T00:00:00Z",
        "services": [[["com"], ["https://rdap.verisign.com/com/v1/"]]]
    });
    Mock::given(method("GET"))
        .and(path("/rdap/dns.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(document))
        .expect(1)
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let snapshot = tmp.path().join("bootstrap.json");
    let config = RdapConfig {
        bootstrap_url: format!("{}/rdap/dns.json", server.uri()),
        bootstrap_cache_path: Some(snapshot.clone()),
        timeout_secs: 5,
        requests_per_second: 0,
    };
    let client = reqwest::Client::new();

    let fetched = BootstrapCache::initialize(&config, &client).await.unwrap();
    assert_eq!(fetched.endpoint_for("com"), Some("https://rdap.verisign.com/com/v1/"));
    assert!(snapshot.exists());

    // Second start-up reads the snapshot; the mock expects exactly one fetch
    let reloaded = BootstrapCache::initialize(&config, &client).await.unwrap();
    assert_eq!(reloaded.publication(), Some("2026-02-01T00:00:00Z"));
}

#[tokio::test]
async fn test_bootstrap_fetch_failure_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = BootstrapCache::fetch(&reqwest::Client::new(), &format!("{}/rdap/dns.json", server.uri())).await;
    assert!(result.is_err());
}
