use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// DoH JSON body answering a CNAME question with the given targets
pub fn doh_cname_body(domain: &str, targets: &[&str]) -> serde_json::Value {
    let answers: Vec<serde_json::Value> = targets
        .iter()
        .map(|target| {
            serde_json::json!({
                "name": format!("{}.", domain),
                "type": 5,  // CNAME record type
                "TTL": 300,
                "data": format!("{}.", target)
            })
        })
        .collect();
    let status = if targets.is_empty() { 3 } else { 0 };

    serde_json::json!({
        "Status": status,
        "TC": false,
        "RD": true,
        "RA": true,
        "AD": false,
        "CD": false,
        "Question": [{
            "name": format!("{}.", domain),
            "type": 5
        }],
        "Answer": answers
    })
}

/// Starts a mock DNS-over-HTTPS server.
///
/// Each `(domain, targets)` pair is answered at `/dns-query` for
/// `name=domain&type=CNAME`. Unknown names get a 404 from wiremock.
pub async fn mock_doh_cname_server(records: &[(&str, &[&str])]) -> MockServer {
    let server = MockServer::start().await;

    for (domain, targets) in records {
        Mock::given(method("GET"))
            .and(path("/dns-query"))
            .and(query_param("name", *domain))
            .and(query_param("type", "CNAME"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(doh_cname_body(domain, targets))
                    .insert_header("content-type", "application/dns-json"),
            )
            .mount(&server)
            .await;
    }

    server
}

/// DoH URL for a mock server started by [`mock_doh_cname_server`]
pub fn doh_url(server: &MockServer) -> String {
    format!("{}/dns-query", server.uri())
}

/// Starts a mock RDAP server answering `/domain/{apex}` with the given status.
///
/// 200 responses carry a minimal RDAP domain object. `expected_calls`, when
/// set, is verified when the server is dropped.
pub async fn mock_rdap_server(domains: &[(&str, u16)], expected_calls: Option<u64>) -> MockServer {
    let server = MockServer::start().await;

    for (apex, status) in domains {
        let template = if *status == 200 {
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({
                    "objectClassName": "domain",
                    "ldhName": apex.to_uppercase(),
                    "status": ["active"]
                }))
                .insert_header("content-type", "application/rdap+json")
        } else {
            ResponseTemplate::new(*status)
        };

        let mock = Mock::given(method("GET"))
            .and(path(format!("/domain/{}", apex)))
            .respond_with(template);
        let mock = match expected_calls {
            Some(n) => mock.expect(n),
            None => mock,
        };
        mock.mount(&server).await;
    }

    server
}

/// Starts a mock HTTP server standing in for a service endpoint.
pub async fn mock_service_page(status_code: u16, body: &str) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(status_code)
                .set_body_string(body.to_string())
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(&server)
        .await;

    server
}

/// Creates a mock HTTP server that returns the specified HTTP error status code.
pub async fn mock_error_server(status_code: u16) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(status_code))
        .mount(&server)
        .await;

    server
}
