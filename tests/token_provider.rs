use std::sync::Arc;
use std::time::Duration;

use checkout_backend::clock::ManualClock;
use checkout_backend::error::{ErrorKind, PaypalError};
use checkout_backend::paypal::PaypalClient;
use checkout_backend::PaypalConfig;
use httpmock::prelude::*;
use serde_json::json;

// base64("test-client:test-secret")
const BASIC_AUTH: &str = "Basic dGVzdC1jbGllbnQ6dGVzdC1zZWNyZXQ=";

fn client_for(server: &MockServer, clock: &ManualClock) -> PaypalClient {
    let config = PaypalConfig::for_base_url(server.base_url(), "test-client", "test-secret");
    PaypalClient::with_clock(&config, Arc::new(clock.clone())).unwrap()
}

#[tokio::test]
async fn access_token_is_fetched_once_within_ttl() {
    let server = MockServer::start_async().await;
    let token_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/oauth2/token")
            .header("authorization", BASIC_AUTH)
            .header("accept-language", "en_US")
            .body("grant_type=client_credentials");
        then.status(200).json_body(json!({
            "scope": "https://uri.paypal.com/services/payments/payment",
            "access_token": "A21AAF-token",
            "token_type": "Bearer",
            "app_id": "APP-80W284485P519543T",
            "expires_in": 32400,
            "nonce": "2024-01-01T00:00:00Z-nonce",
        }));
    });

    let clock = ManualClock::new();
    let paypal = client_for(&server, &clock);

    let first = paypal.access_token().await.unwrap();
    clock.advance(Duration::from_secs(32399));
    let second = paypal.access_token().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.access_token, "A21AAF-token");
    assert_eq!(first.token_type.as_deref(), Some("Bearer"));
    token_mock.assert_hits(1);
}

#[tokio::test]
async fn expired_access_token_is_refetched() {
    let server = MockServer::start_async().await;
    let token_mock = server.mock(|when, then| {
        when.method(POST).path("/v1/oauth2/token");
        then.status(200)
            .json_body(json!({ "access_token": "short-lived", "expires_in": 60 }));
    });

    let clock = ManualClock::new();
    let paypal = client_for(&server, &clock);

    paypal.access_token().await.unwrap();
    clock.advance(Duration::from_secs(60));
    paypal.access_token().await.unwrap();
    paypal.access_token().await.unwrap();

    token_mock.assert_hits(2);
}

#[tokio::test]
async fn concurrent_misses_share_one_exchange() {
    let server = MockServer::start_async().await;
    let token_mock = server.mock(|when, then| {
        when.method(POST).path("/v1/oauth2/token");
        then.status(200)
            .delay(Duration::from_millis(100))
            .json_body(json!({ "access_token": "shared", "expires_in": 3600 }));
    });

    let clock = ManualClock::new();
    let paypal = client_for(&server, &clock);

    let (left, right) = tokio::join!(paypal.access_token(), paypal.access_token());
    assert_eq!(left.unwrap().access_token, "shared");
    assert_eq!(right.unwrap().access_token, "shared");
    token_mock.assert_hits(1);
    assert_eq!(paypal.tokens().pending_exchanges(), 0);
}

#[tokio::test]
async fn provider_error_message_is_composed() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path("/v1/oauth2/token");
        then.status(401).json_body(json!({
            "error": "invalid_client",
            "error_description": "Client Authentication failed",
        }));
    });

    let paypal = client_for(&server, &ManualClock::new());
    let error = paypal.access_token().await.unwrap_err();

    assert_eq!(error.to_string(), "invalid_client - Client Authentication failed");
    assert_eq!(error.status_code(), Some(401));
    assert_eq!(error.kind(), ErrorKind::Provider);
}

#[tokio::test]
async fn unexplained_failure_uses_default_message() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path("/v1/oauth2/token");
        then.status(500).json_body(json!({}));
    });

    let paypal = client_for(&server, &ManualClock::new());
    let error = paypal.access_token().await.unwrap_err();

    assert_eq!(error.to_string(), "FAILED_TO_CREATE_ACCESS_TOKEN");
    assert_eq!(error.status_code(), Some(500));
}

#[tokio::test]
async fn failed_exchange_is_not_cached() {
    let server = MockServer::start_async().await;
    let token_mock = server.mock(|when, then| {
        when.method(POST).path("/v1/oauth2/token");
        then.status(503).body("upstream unavailable");
    });

    let paypal = client_for(&server, &ManualClock::new());
    assert!(paypal.access_token().await.is_err());
    assert!(paypal.access_token().await.is_err());
    token_mock.assert_hits(2);
    assert_eq!(paypal.tokens().pending_exchanges(), 0);
}

#[tokio::test]
async fn unreachable_provider_has_no_status() {
    let config = PaypalConfig::for_base_url("http://127.0.0.1:9", "test-client", "test-secret");
    let paypal = PaypalClient::new(&config).unwrap();
    let error = paypal.access_token().await.unwrap_err();

    assert_eq!(error.to_string(), "FAILED_TO_CREATE_ACCESS_TOKEN");
    assert_eq!(error.status_code(), None);
    assert_eq!(error.kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn missing_credentials_fail_without_network() {
    let server = MockServer::start_async().await;
    let token_mock = server.mock(|when, then| {
        when.method(POST).path("/v1/oauth2/token");
        then.status(200)
            .json_body(json!({ "access_token": "unused", "expires_in": 3600 }));
    });

    let config = PaypalConfig::for_base_url(server.base_url(), "test-client", "");
    let paypal = PaypalClient::new(&config).unwrap();
    let error = paypal.access_token().await.unwrap_err();

    assert!(matches!(error, PaypalError::MissingCredentials));
    assert_eq!(error.to_string(), "MISSING_API_CREDENTIALS");
    token_mock.assert_hits(0);
}

#[tokio::test]
async fn client_token_is_cached_per_access_token() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path("/v1/oauth2/token");
        then.status(200)
            .json_body(json!({ "access_token": "A-TOKEN", "expires_in": 32400 }));
    });
    let client_token_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/identity/generate-token")
            .header("authorization", "Bearer A-TOKEN");
        then.status(200)
            .json_body(json!({ "client_token": "eyJicmFpbnRyZWUiOnt9fQ==", "expires_in": 3600 }));
    });

    let clock = ManualClock::new();
    let paypal = client_for(&server, &clock);

    let first = paypal.client_token().await.unwrap();
    let second = paypal.client_token().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.client_token, "eyJicmFpbnRyZWUiOnt9fQ==");
    client_token_mock.assert_hits(1);

    clock.advance(Duration::from_secs(3600));
    paypal.client_token().await.unwrap();
    client_token_mock.assert_hits(2);
    assert_eq!(paypal.tokens().pending_exchanges(), 0);
}

#[tokio::test]
async fn rotating_access_tokens_leave_no_guards_behind() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path("/v1/identity/generate-token");
        then.status(200)
            .json_body(json!({ "client_token": "client", "expires_in": 3600 }));
    });

    let paypal = client_for(&server, &ManualClock::new());
    let (first, second) = tokio::join!(
        paypal.tokens().generate_client_token("A-TOKEN-1"),
        paypal.tokens().generate_client_token("A-TOKEN-1"),
    );
    first.unwrap();
    second.unwrap();
    for access_token in ["A-TOKEN-2", "A-TOKEN-3", "A-TOKEN-4"] {
        paypal.tokens().generate_client_token(access_token).await.unwrap();
    }

    assert_eq!(paypal.tokens().pending_exchanges(), 0);
}

#[tokio::test]
async fn client_token_failure_uses_its_own_default_message() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path("/v1/oauth2/token");
        then.status(200)
            .json_body(json!({ "access_token": "A-TOKEN", "expires_in": 32400 }));
    });
    server.mock(|when, then| {
        when.method(POST).path("/v1/identity/generate-token");
        then.status(400).json_body(json!({}));
    });

    let paypal = client_for(&server, &ManualClock::new());
    let error = paypal.client_token().await.unwrap_err();
    assert_eq!(error.to_string(), "FAILED_TO_GENERATE_CLIENT_TOKEN");
    assert_eq!(error.status_code(), Some(400));
}

#[tokio::test]
async fn empty_access_token_is_rejected() {
    let server = MockServer::start_async().await;
    let paypal = client_for(&server, &ManualClock::new());
    let error = paypal.tokens().generate_client_token("").await.unwrap_err();
    assert!(matches!(error, PaypalError::MissingAccessToken));
}
