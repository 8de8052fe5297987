//! Integration tests for login, silent refresh and logout

use super::*;
use oauth2_api_client::{
    ApiClient, FileRefreshTokenStore, InMemoryRefreshTokenStore, LoginStatus, RefreshTokenStore,
};
use pretty_assertions::assert_eq;
use wiremock::matchers::{body_string, body_string_contains, header, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_login_posts_password_grant_and_persists_refresh_token() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string(
            "grant_type=password&client_id=app&client_secret=secret&scope=api&username=alice&password=p%40ss",
        ))
        .respond_with(token_response("at-1", "rt-1"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::TempDir::new().unwrap();
    let token_path = dir.path().join("refresh_token.json");
    let client = ApiClient::with_store(
        test_config(&mock_server),
        FileRefreshTokenStore::new(&token_path),
    )
    .unwrap();

    let mut status = client.login_status();
    client.login("alice", "p@ss");

    assert_eq!(status.recv().await, Some(LoginStatus::Unknown));
    assert_eq!(status.recv().await, Some(LoginStatus::Unknown));
    assert_eq!(status.recv().await, Some(LoginStatus::Authenticated));
    assert_eq!(
        client.http_options().set_authorization().authorization(),
        Some("Bearer at-1")
    );

    let stored = FileRefreshTokenStore::new(&token_path);
    let mut persisted = None;
    for _ in 0..50 {
        persisted = stored.get().await.unwrap();
        if persisted.is_some() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(persisted.as_deref(), Some("rt-1"));
    mock_server.verify().await;
}

#[tokio::test]
async fn test_initialize_restores_session_from_stored_token() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=rt-0"))
        .respond_with(token_response("at-2", "rt-2"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = ApiClient::with_store(
        test_config(&mock_server),
        InMemoryRefreshTokenStore::with_token("rt-0"),
    )
    .unwrap();

    client.initialize().await;

    assert_eq!(client.current_status(), LoginStatus::Authenticated);
    assert_eq!(
        client.tokens().authorization_header().as_deref(),
        Some("Bearer at-2")
    );
    assert!(client.tokens().refresh_deadline().is_some());
    mock_server.verify().await;
}

#[tokio::test]
async fn test_initialize_without_stored_token_sends_nothing() {
    let mock_server = setup_mock_server().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(test_config(&mock_server)).unwrap();
    let mut status = client.login_status();

    client.initialize().await;

    assert_eq!(status.recv().await, Some(LoginStatus::Unknown));
    assert_eq!(status.recv().await, Some(LoginStatus::NotAuthenticated));
    mock_server.verify().await;
}

#[tokio::test]
async fn test_rejected_credentials_end_unauthenticated() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = ApiClient::with_store(
        test_config(&mock_server),
        InMemoryRefreshTokenStore::with_token("stale"),
    )
    .unwrap();

    let error = client.authenticate("alice", "wrong").await.unwrap_err();

    assert_eq!(error.to_string(), "HTTP 401 Unauthorized");
    assert!(error.needs_reauth());
    assert_eq!(client.current_status(), LoginStatus::NotAuthenticated);
    assert_eq!(client.refresh().await.unwrap_err().to_string(), "No refresh token available");
    mock_server.verify().await;
}

#[tokio::test]
async fn test_token_server_errors_are_retried_three_times() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(503))
        .expect(4)
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(test_config(&mock_server)).unwrap();

    let result = client.authenticate("alice", "pw").await;

    assert!(result.is_err());
    assert_eq!(client.current_status(), LoginStatus::NotAuthenticated);
    mock_server.verify().await;
}

#[tokio::test]
async fn test_logout_clears_session() {
    let mock_server = setup_mock_server().await;
    mount_token_endpoint(&mock_server, token_response("at-1", "rt-1")).await;

    let client = ApiClient::new(test_config(&mock_server)).unwrap();
    client.authenticate("alice", "pw").await.unwrap();
    assert_eq!(client.current_status(), LoginStatus::Authenticated);

    client.logout().await;

    assert_eq!(client.current_status(), LoginStatus::NotAuthenticated);
    assert_eq!(client.http_options().set_authorization().authorization(), None);
    assert_eq!(client.tokens().refresh_deadline(), None);
    assert!(client.refresh().await.is_err());
}
