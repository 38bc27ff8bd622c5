//! Tests for the HTTP module

use super::*;
use crate::types::{BackoffType, Method, OrderedStringMap};
use serde_json::json;
use std::time::Duration;
use test_case::test_case;
use url::Url;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client() -> HttpClient {
    HttpClient::with_config(HttpClientConfig::builder().unthrottled().build()).unwrap()
}

#[test]
fn test_http_client_config_default() {
    let config = HttpClientConfig::default();
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert!(config.throttle.is_none());
    assert!(config.user_agent.starts_with("pagewalk/"));
}

#[test]
fn test_http_client_config_builder() {
    let config = HttpClientConfig::builder()
        .timeout(Duration::from_secs(60))
        .throttle(ThrottleConfig::per_second(5))
        .header("X-Custom", "value")
        .user_agent("test-agent/1.0")
        .build();

    assert_eq!(config.timeout, Duration::from_secs(60));
    assert_eq!(config.throttle, Some(ThrottleConfig::per_second(5)));
    assert_eq!(
        config.default_headers.get("X-Custom"),
        Some(&"value".to_string())
    );
    assert_eq!(config.user_agent, "test-agent/1.0");
}

#[tokio::test]
async fn test_fetch_get_with_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/users"))
        .and(query_param("limit", "2"))
        .and(header("Authorization", "Bearer token"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Link", "<https://x/y?page=2>; rel=\"next\"")
                .set_body_json(json!({"data": [{"id": 1}]})),
        )
        .mount(&mock_server)
        .await;

    let url = Url::parse(&format!("{}/api/users?limit=2", mock_server.uri())).unwrap();
    let mut headers = OrderedStringMap::new();
    headers.insert("Authorization".to_string(), "Bearer token".to_string());

    let response = client()
        .fetch(PageRequest {
            method: Method::GET,
            url: &url,
            headers: &headers,
            body: None,
        })
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert!(!response.is_error());
    assert_eq!(response.body["data"][0]["id"], 1);
    assert_eq!(
        response.header("link"),
        Some("<https://x/y?page=2>; rel=\"next\"")
    );
}

#[tokio::test]
async fn test_fetch_does_not_fail_on_error_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"errors": "not found"})))
        .mount(&mock_server)
        .await;

    let url = Url::parse(&format!("{}/api/missing", mock_server.uri())).unwrap();
    let response = client()
        .fetch(PageRequest {
            method: Method::GET,
            url: &url,
            headers: &OrderedStringMap::new(),
            body: None,
        })
        .await
        .unwrap();

    assert_eq!(response.status, 404);
    assert!(response.is_error());
    assert_eq!(response.body["errors"], "not found");
}

#[tokio::test]
async fn test_fetch_non_json_body_becomes_string() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/plain"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&mock_server)
        .await;

    let url = Url::parse(&format!("{}/plain", mock_server.uri())).unwrap();
    let response = client()
        .fetch(PageRequest {
            method: Method::GET,
            url: &url,
            headers: &OrderedStringMap::new(),
            body: None,
        })
        .await
        .unwrap();

    assert_eq!(response.status, 503);
    assert_eq!(response.body, json!("upstream down"));
}

#[tokio::test]
async fn test_fetch_post_sends_json_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/search"))
        .and(body_json(json!({"q": "shoes"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = Url::parse(&format!("{}/api/search", mock_server.uri())).unwrap();
    let body = json!({"q": "shoes"});
    let response = client()
        .fetch(PageRequest {
            method: Method::POST,
            url: &url,
            headers: &OrderedStringMap::new(),
            body: Some(&body),
        })
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body, json!([]));
}

#[tokio::test]
async fn test_fetch_empty_body_is_null() {
    let mock_server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/api/items"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let url = Url::parse(&format!("{}/api/items", mock_server.uri())).unwrap();
    let body = json!({"ignored": true});
    let response = client()
        .fetch(PageRequest {
            method: Method::HEAD,
            url: &url,
            headers: &OrderedStringMap::new(),
            body: Some(&body),
        })
        .await
        .unwrap();

    assert_eq!(response.status, 204);
    assert!(response.body.is_null());
}

#[test]
fn test_http_client_debug() {
    let client = client();
    let debug = format!("{client:?}");
    assert!(debug.contains("HttpClient"));
    assert!(debug.contains("throttled: false"));
}

#[tokio::test]
async fn test_throttled_client_still_fetches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/paced"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(2)
        .mount(&server)
        .await;

    let config = HttpClientConfig::builder()
        .throttle(ThrottleConfig::per_second(100))
        .build();
    let client = HttpClient::with_config(config).unwrap();
    assert!(format!("{client:?}").contains("throttled: true"));

    let url = Url::parse(&format!("{}/paced", server.uri())).unwrap();
    let headers = OrderedStringMap::new();
    for _ in 0..2 {
        let response = client
            .fetch(PageRequest {
                method: Method::GET,
                url: &url,
                headers: &headers,
                body: None,
            })
            .await
            .unwrap();
        assert_eq!(response.status, 200);
    }
}

// ============================================================================
// Retry Policy Tests
// ============================================================================

#[test]
fn test_retry_policy_default() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.delay, Duration::from_secs(5));
    assert_eq!(policy.backoff, BackoffType::Constant);
    assert_eq!(policy.max_retries, Some(10));
}

#[test]
fn test_calculate_backoff_constant() {
    let policy = RetryPolicy::constant(Duration::from_millis(100), None);
    assert_eq!(policy.calculate_backoff(0), Duration::from_millis(100));
    assert_eq!(policy.calculate_backoff(7), Duration::from_millis(100));
}

#[test]
fn test_calculate_backoff_linear() {
    let policy = RetryPolicy {
        delay: Duration::from_millis(100),
        backoff: BackoffType::Linear,
        max_delay: Duration::from_secs(10),
        max_retries: None,
    };
    assert_eq!(policy.calculate_backoff(0), Duration::from_millis(100));
    assert_eq!(policy.calculate_backoff(1), Duration::from_millis(200));
    assert_eq!(policy.calculate_backoff(4), Duration::from_millis(500));
}

#[test]
fn test_calculate_backoff_exponential_respects_max() {
    let policy = RetryPolicy {
        delay: Duration::from_millis(100),
        backoff: BackoffType::Exponential,
        max_delay: Duration::from_millis(500),
        max_retries: None,
    };
    assert_eq!(policy.calculate_backoff(0), Duration::from_millis(100));
    assert_eq!(policy.calculate_backoff(1), Duration::from_millis(200));
    assert_eq!(policy.calculate_backoff(2), Duration::from_millis(400));
    assert_eq!(policy.calculate_backoff(3), Duration::from_millis(500));
    assert_eq!(policy.calculate_backoff(40), Duration::from_millis(500));
}

#[test]
fn test_next_delay_respects_ceiling() {
    let policy = RetryPolicy::constant(Duration::from_millis(10), Some(2));
    assert!(policy.next_delay(0).is_some());
    assert!(policy.next_delay(1).is_some());
    assert!(policy.next_delay(2).is_none());

    let unbounded = RetryPolicy::constant(Duration::from_millis(10), None);
    assert_eq!(unbounded.next_delay(10_000), Some(Duration::from_millis(10)));
}

#[test_case(429, json!(null), true ; "status 429")]
#[test_case(400, json!({"errors": "Exceeded 2 calls per second for api client. Reduce request rates to resume uninterrupted service. rate limit"}), true ; "string errors")]
#[test_case(403, json!({"errors": ["first", "API Rate Limit exceeded"]}), true ; "list errors case insensitive")]
#[test_case(400, json!({"errors": ["bad param"]}), false ; "list without marker")]
#[test_case(500, json!({"message": "rate limit"}), false ; "marker outside errors")]
#[test_case(401, json!("rate limit"), false ; "string body")]
fn test_is_rate_limited(status: u16, body: serde_json::Value, expected: bool) {
    assert_eq!(is_rate_limited(status, &body), expected);
}
