//! Integration tests for the reqwest middleware.
//!
//! These use wiremock to check that requests are paced and blocked by the
//! turnstile they pass through.

#![cfg(feature = "middleware")]

use reqwest_middleware::ClientBuilder;
use std::sync::Arc;
use std::time::{Duration, Instant};
use turnstile_gate::{Turnstile, TurnstileMiddleware};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper to create a mock server with a simple OK response.
async fn setup_mock_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_requests_are_paced() {
    let server = setup_mock_server().await;

    let turnstile = Turnstile::builder().rate("20/s".parse().unwrap()).build();
    turnstile.start().unwrap();
    let middleware = TurnstileMiddleware::new(turnstile);

    let client = ClientBuilder::new(reqwest::Client::new())
        .with(middleware.clone())
        .build();

    let url = format!("{}/test", server.uri());
    let start = Instant::now();
    for i in 0..4 {
        let resp = client.get(&url).send().await;
        assert!(resp.is_ok(), "Request {i} should succeed after pacing");
    }

    // 50ms per event: the 4th request goes out ~200ms in.
    let elapsed = start.elapsed();
    assert!(
        elapsed >= Duration::from_millis(180),
        "Requests were not paced: {elapsed:?}"
    );
    assert_eq!(middleware.turnstile().events_seen(), 4);
    assert_eq!(middleware.turnstile().observer().window_len(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_blocked_turnstile_holds_requests() {
    let server = setup_mock_server().await;

    let turnstile = Arc::new(Turnstile::builder().build());
    let client = Arc::new(
        ClientBuilder::new(reqwest::Client::new())
            .with(TurnstileMiddleware::shared(turnstile.clone()))
            .build(),
    );

    turnstile.block().await;
    let url = format!("{}/test", server.uri());
    let handle = {
        let client = client.clone();
        tokio::spawn(async move { client.get(&url).send().await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!handle.is_finished(), "Request went out while blocked");

    turnstile.unblock().await;
    let resp = handle.await.unwrap();
    assert!(resp.is_ok(), "Request should go out once unblocked");
}
