//! Tests for the HTTP fetch capability

use super::*;
use axum::Router;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use std::net::SocketAddr;

async fn spawn_server() -> SocketAddr {
    async fn echo(headers: HeaderMap, body: String) -> (StatusCode, String) {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        (StatusCode::CREATED, format!("{auth}|{body}"))
    }

    async fn slow() -> &'static str {
        tokio::time::sleep(Duration::from_millis(500)).await;
        "late"
    }

    async fn json() -> ([(&'static str, &'static str); 1], &'static str) {
        ([("content-type", "application/json")], r#"{"ok":true}"#)
    }

    let app = Router::new()
        .route("/echo", post(echo))
        .route("/slow", get(slow))
        .route("/json", get(json));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn test_http_fetch_post() {
    let addr = spawn_server().await;
    let fetch = HttpFetch::new(Duration::from_secs(5)).unwrap();

    let request = FetchRequest::post(format!("http://{addr}/echo"), "payload")
        .with_header("Authorization", "Bearer t");
    let response = fetch.fetch(request, Some(FetchExtras::silent())).await.unwrap();

    assert_eq!(response.status, 201);
    assert_eq!(response.status_text, "Created");
    assert!(response.ok());
    assert_eq!(response.text(), "Bearer t|payload");
}

#[tokio::test]
async fn test_http_fetch_non_2xx_is_a_response() {
    let addr = spawn_server().await;
    let fetch = HttpFetch::new(Duration::from_secs(5)).unwrap();

    let response = fetch
        .fetch(FetchRequest::get(format!("http://{addr}/missing")), None)
        .await
        .unwrap();

    assert_eq!(response.status, 404);
    assert_eq!(response.status_text, "Not Found");
    assert!(!response.ok());
}

#[tokio::test]
async fn test_http_fetch_json_and_headers() {
    let addr = spawn_server().await;
    let fetch = HttpFetch::new(Duration::from_secs(5)).unwrap();

    let response = fetch
        .fetch(FetchRequest::get(format!("http://{addr}/json")), None)
        .await
        .unwrap();

    assert_eq!(response.header("Content-Type"), Some("application/json"));
    let body: serde_json::Value = response.json().unwrap();
    assert_eq!(body["ok"], serde_json::json!(true));
}

#[tokio::test]
async fn test_http_fetch_timeout() {
    let addr = spawn_server().await;
    let fetch = HttpFetch::new(Duration::from_millis(100)).unwrap();

    let err = fetch
        .fetch(FetchRequest::get(format!("http://{addr}/slow")), None)
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Timeout(_)), "got {err:?}");
}

#[tokio::test]
async fn test_http_fetch_invalid_method() {
    let fetch = HttpFetch::new(Duration::from_secs(1)).unwrap();
    let mut request = FetchRequest::get("http://127.0.0.1:1/");
    request.method = "BAD METHOD".into();

    let err = fetch.fetch(request, None).await.unwrap_err();
    assert!(matches!(err, FetchError::InvalidRequest(_)));
}

#[test]
fn test_fetch_error_becomes_unclassified() {
    let err: FunctionError = FetchError::Network("connection refused".into()).into();
    assert_eq!(err, FunctionError::other("network error: connection refused"));
}

#[test]
fn test_request_header_lookup_is_case_insensitive() {
    let request = FetchRequest::get("http://x").with_header("X-Token", "abc");
    assert_eq!(request.header("x-token"), Some("abc"));
    assert_eq!(request.header("other"), None);
}
