//! Integration tests using WireMock
//!
//! These tests drive the client through the reqwest transport against a mock
//! HTTP server, covering the token endpoint exchange and the REST façade.

pub mod rest_api;
pub mod session;

use oauth2_api_client::{oauth2_client_config, ClientConfig, RetryConfig};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper to create a mock server
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Client configuration pointing at `server`, with short retry backoff.
pub fn test_config(server: &MockServer) -> ClientConfig {
    oauth2_client_config()
        .url(server.uri())
        .token_path("/oauth/token")
        .client_id("app")
        .client_secret("secret")
        .scope("api")
        .retry_config(RetryConfig {
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            ..Default::default()
        })
        .build()
        .expect("valid test config")
}

/// Successful token endpoint response.
pub fn token_response(access_token: &str, refresh_token: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "expires_in": 3600,
        "refresh_token": refresh_token,
    }))
}

/// Token endpoint answering every request with `response`.
pub async fn mount_token_endpoint(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(response)
        .mount(server)
        .await;
}
