//! Integration tests for the REST façade

use super::*;
use oauth2_api_client::{format_error, ApiClient, ApiError, RequestOptions};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_get_joins_path_onto_base_url() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/my/data/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(test_config(&mock_server)).expect("Failed to build client");

    let value: Value = client.get("/my/data/7", None, None).await.unwrap();

    assert_eq!(value, json!({"id": 7}));

    let requests = mock_server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_get_retries_server_errors_five_times() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(json!({"errors": [{"status": "500", "detail": "database offline"}]})),
        )
        .expect(6)
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(test_config(&mock_server)).unwrap();

    let error = client.get::<Value>("items", None, None).await.unwrap_err();

    assert_eq!(
        format_error(&error),
        "HTTP 500 Internal Server Error: database offline"
    );
    mock_server.verify().await;
}

#[tokio::test]
async fn test_post_validation_error_surfaces_detail() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/items"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"name": ""})))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "errors": [
                {"status": "422", "title": "Invalid attribute", "detail": "Name can't be blank"},
                {"status": "422", "detail": "Second problem"}
            ]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(test_config(&mock_server)).unwrap();

    let error = client
        .post::<_, Value>("items", &json!({"name": ""}), None, None)
        .await
        .unwrap_err();

    assert_eq!(error.status(), Some(422));
    assert_eq!(
        error.to_string(),
        "HTTP 422 Unprocessable Entity: Name can't be blank"
    );
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(test_config(&mock_server)).unwrap();

    let error = client.get::<Value>("missing", None, None).await.unwrap_err();

    assert_eq!(error.to_string(), "HTTP 404 Not Found");
    mock_server.verify().await;
}

#[tokio::test]
async fn test_other_status_reports_url() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("PATCH"))
        .and(path("/items/1"))
        .respond_with(ResponseTemplate::new(409))
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(test_config(&mock_server)).unwrap();

    let error = client
        .patch::<_, Value>("items/1", &json!({"name": "x"}), None, None)
        .await
        .unwrap_err();

    assert_eq!(
        error.to_string(),
        format!(
            "Http failure response for {}/items/1: 409 Conflict",
            mock_server.uri()
        )
    );
}

#[tokio::test]
async fn test_delete_retries_once_and_accepts_empty_body() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("DELETE"))
        .and(path("/items/1"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/items/1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(test_config(&mock_server)).unwrap();

    let () = client.delete("items/1", None, None).await.unwrap();

    mock_server.verify().await;
}

#[tokio::test]
async fn test_timeout_bounds_the_call() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(test_config(&mock_server)).unwrap();

    let error = client
        .post::<_, Value>(
            "slow",
            &json!({}),
            None,
            Some(RequestOptions::new().timeout(Duration::from_millis(100))),
        )
        .await
        .unwrap_err();

    assert!(matches!(error, ApiError::Timeout { .. }));
    assert_eq!(error.to_string(), "Request timed out after 100 ms");
}

#[tokio::test]
async fn test_call_timeout_overrides_transport_timeout() {
    let mock_server = setup_mock_server().await;

    Mock::given(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"ok": true}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&mock_server)
        .await;

    let mut config = test_config(&mock_server);
    config.transport_timeout = Some(Duration::from_millis(200));
    let client = ApiClient::new(config).unwrap();

    let value: Value = client
        .post(
            "slow",
            &json!({}),
            None,
            Some(RequestOptions::new().timeout(Duration::from_secs(5))),
        )
        .await
        .unwrap();
    assert_eq!(value["ok"], true);

    let error = client
        .get::<Value>("slow", None, Some(RequestOptions::new().retry(0)))
        .await
        .unwrap_err();
    assert_eq!(error.to_string(), "Request timed out after 200 ms");
}

#[tokio::test]
async fn test_authorization_and_params_are_opt_in() {
    let mock_server = setup_mock_server().await;
    mount_token_endpoint(&mock_server, token_response("at-1", "rt-1")).await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .and(header("authorization", "Bearer at-1"))
        .and(query_param("page", "2"))
        .and(query_param("active", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([1, 2])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(test_config(&mock_server)).unwrap();
    client.authenticate("alice", "pw").await.unwrap();

    let options = client
        .http_options()
        .set_authorization()
        .set_param("page", 2)
        .set_param("active", true);
    let items: Vec<u32> = client.get("items", Some(options), None).await.unwrap();

    assert_eq!(items, vec![1, 2]);
    mock_server.verify().await;
}
