//! HTTP behavior tests against a mock instance: retry policy, Retry-After
//! handling, error taxonomy, and auth header placement.

use std::time::{Duration, Instant};

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use n8nctl_api::{ApiClient, ApiConfig, ApiError, RetryPolicy, WorkflowFilters};

fn client_for(server: &MockServer) -> ApiClient {
    let config = ApiConfig {
        base_url: server.uri(),
        api_key: "test-key".to_string(),
        timeout: Duration::from_secs(5),
        retry: RetryPolicy {
            initial_delay: Duration::from_millis(5),
            jitter_factor: 0.0,
            ..Default::default()
        },
    };
    ApiClient::new(config).unwrap()
}

#[tokio::test]
async fn api_key_header_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/workflows"))
        .and(header("X-N8N-API-KEY", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&server)
        .await;

    let page = client_for(&server)
        .list_workflows(&WorkflowFilters::default())
        .await
        .unwrap();
    assert!(page.data.is_empty());
}

/// Responder that fails with 503 a fixed number of times, then succeeds.
struct FlakyThenOk {
    failures: std::sync::atomic::AtomicU32,
    budget: u32,
}

impl Respond for FlakyThenOk {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let n = self
            .failures
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if n < self.budget {
            ResponseTemplate::new(503)
        } else {
            ResponseTemplate::new(200).set_body_json(json!({
                "id": "w1", "name": "Flaky", "active": false,
                "nodes": [], "connections": {}
            }))
        }
    }
}

#[tokio::test]
async fn server_errors_are_retried_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/workflows/w1"))
        .respond_with(FlakyThenOk {
            failures: Default::default(),
            budget: 2,
        })
        .expect(3)
        .mount(&server)
        .await;

    let workflow = client_for(&server).get_workflow("w1").await.unwrap();
    assert_eq!(workflow.name, "Flaky");
}

#[tokio::test]
async fn retry_gives_up_after_the_attempt_cap() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/workflows/w1"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let err = client_for(&server).get_workflow("w1").await.unwrap_err();
    assert!(matches!(err, ApiError::Server { status: 500, .. }));
}

#[tokio::test]
async fn not_found_is_never_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/workflows/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "not found"})))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server).get_workflow("missing").await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound { .. }));
    assert_eq!(err.class().exit_code(), 65);
}

#[tokio::test]
async fn unauthorized_is_never_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/workflows"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "bad key"})))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .list_workflows(&WorkflowFilters::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized { .. }));
    assert_eq!(err.class().exit_code(), 77);
}

/// Responder that rate-limits once with Retry-After, then succeeds.
struct RateLimitOnce {
    hits: std::sync::atomic::AtomicU32,
}

impl Respond for RateLimitOnce {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        if self.hits.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 0 {
            ResponseTemplate::new(429).insert_header("Retry-After", "1")
        } else {
            ResponseTemplate::new(200).set_body_json(json!({
                "id": "w1", "name": "Limited", "active": true
            }))
        }
    }
}

#[tokio::test]
async fn rate_limit_honors_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/workflows/w1/activate"))
        .respond_with(RateLimitOnce {
            hits: Default::default(),
        })
        .expect(2)
        .mount(&server)
        .await;

    let started = Instant::now();
    let summary = client_for(&server).activate_workflow("w1").await.unwrap();
    assert!(summary.active);
    assert!(
        started.elapsed() >= Duration::from_secs(1),
        "Retry-After must delay the retry"
    );
}

#[tokio::test]
async fn malformed_payload_is_a_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/workflows"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .list_workflows(&WorkflowFilters::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Protocol { .. }));
    assert_eq!(err.class().exit_code(), 72);
}

#[tokio::test]
async fn list_filters_become_query_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/workflows"))
        .and(query_param("active", "true"))
        .and(query_param("tags", "ops,alerts"))
        .and(query_param("limit", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "w1", "name": "A", "active": true}],
            "nextCursor": "abc"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = client_for(&server)
        .list_workflows(&WorkflowFilters {
            active: Some(true),
            tags: vec!["ops".into(), "alerts".into()],
            limit: Some(50),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.data.len(), 1);
    assert_eq!(page.next_cursor.as_deref(), Some("abc"));
}
