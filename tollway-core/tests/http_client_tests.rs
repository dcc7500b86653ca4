//! HTTP transport stack against a local mock server

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tollway_core::http::{
    HttpClient, HttpRequest, HttpTransport, RateLimitConfig, RateLimitedClient, RateLimiter,
    RetryingClient, TransportError,
};
use tollway_core::retry::{RetryError, RetryPolicy};
use wiremock::matchers::{body_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn limited(server_limit: f64) -> RateLimitedClient {
    RateLimitedClient::new(
        Arc::new(HttpClient::new().unwrap()),
        Arc::new(RateLimiter::per_second(server_limit).unwrap()),
    )
}

fn retrying(max_retries: u32) -> RetryingClient {
    RetryingClient::new(
        limited(100.0),
        RetryPolicy::new(max_retries)
            .with_delays(Duration::from_millis(10), Duration::from_millis(50)),
    )
}

#[tokio::test]
async fn test_client_sends_correlation_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/echo"))
        .and(header_exists("x-request-id"))
        .and(header("idempotency-key", "abc-123"))
        .and(header("x-team", "core"))
        .and(body_json(json!({"ping": true})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"pong": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new().unwrap().with_default_header("x-team", "core");
    let request = HttpRequest::post(format!("{}/v1/echo", server.uri()))
        .json(json!({"ping": true}))
        .with_idempotency_key("abc-123");

    let response = client.send(request).await.unwrap();
    assert!(response.is_success());
    let body: serde_json::Value = response.json().unwrap();
    assert_eq!(body["pong"], true);
}

#[tokio::test]
async fn test_client_returns_error_statuses_as_responses() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let response = HttpClient::new()
        .unwrap()
        .send(HttpRequest::get(server.uri()))
        .await
        .unwrap();
    assert_eq!(response.status, 500);
    assert_eq!(response.text(), "boom");
}

#[tokio::test]
async fn test_response_size_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(2048)))
        .mount(&server)
        .await;

    let client = HttpClient::new().unwrap().with_max_response_size(1024);
    let err = client.send(HttpRequest::get(server.uri())).await.unwrap_err();
    assert!(matches!(err, TransportError::ResponseTooLarge { max: 1024, .. }));
}

#[tokio::test]
async fn test_rate_limited_client_maps_status_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/items"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "3")
                .set_body_json(json!({"error": {"message": "slow down"}})),
        )
        .mount(&server)
        .await;

    let err = limited(100.0)
        .post(&format!("{}/v1/items", server.uri()), json!({"a": 1}))
        .await
        .unwrap_err();

    match err {
        TransportError::Status {
            status,
            retry_after,
            message,
            ..
        } => {
            assert_eq!(status, 429);
            assert_eq!(retry_after, Some(Duration::from_secs(3)));
            assert!(message.contains("slow down"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn test_rate_limited_client_paces_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(4)
        .mount(&server)
        .await;

    let client = RateLimitedClient::new(
        Arc::new(HttpClient::new().unwrap()),
        Arc::new(RateLimiter::new(RateLimitConfig::new(20.0).with_burst(2)).unwrap()),
    );
    let start = std::time::Instant::now();
    for _ in 0..4 {
        client.get(&server.uri()).await.unwrap();
    }
    // Two immediate, two more at 50ms spacing
    assert!(start.elapsed() >= Duration::from_millis(90));
}

#[tokio::test]
async fn test_retrying_client_recovers_from_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let response = retrying(3)
        .get(&format!("{}/flaky", server.uri()))
        .await
        .unwrap();
    assert_eq!(response.text(), "ok");
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_retrying_client_never_retries_forbidden() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let err = retrying(3).delete(&server.uri()).await.unwrap_err();
    assert!(matches!(err, RetryError::Aborted(_)));
    assert_eq!(err.inner().status(), Some(403));
}

#[tokio::test]
async fn test_retrying_client_exhausts_on_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0.02"))
        .expect(3)
        .mount(&server)
        .await;

    let err = retrying(2)
        .put(&server.uri(), json!({"k": "v"}))
        .await
        .unwrap_err();

    match err {
        RetryError::Exhausted {
            max_retries,
            source,
        } => {
            assert_eq!(max_retries, 2);
            assert_eq!(source.status(), Some(429));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn test_connection_failure_is_retried_then_reported() {
    // Nothing listens on this port once the server is dropped
    let uri = {
        let server = MockServer::start().await;
        server.uri()
    };

    let err = retrying(1).get(&uri).await.unwrap_err();
    assert!(err.is_exhausted());
    assert!(matches!(err.inner(), TransportError::Connect { .. }));
}
