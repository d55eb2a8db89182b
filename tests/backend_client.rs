//! Integration tests for the backend API client against a mock backend.
//!
//! Each test starts its own wiremock server and checks the request the
//! client sends and how it maps the response.

use std::time::Duration;

use feedboard::api::{ApiError, BackendClient, QueryRequest};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> BackendClient {
    BackendClient::new(&server.uri(), Duration::from_secs(5)).unwrap()
}

fn request() -> QueryRequest {
    QueryRequest {
        start: "2024-05-01T00:00:00Z".to_string(),
        end: "2024-05-02T00:00:00Z".to_string(),
        limit: 500,
        query: "rust".to_string(),
        summarize: false,
    }
}

#[tokio::test]
async fn test_query_posts_request_and_decodes_items() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_json(json!({
            "start": "2024-05-01T00:00:00Z",
            "end": "2024-05-02T00:00:00Z",
            "limit": 500,
            "query": "rust",
            "summarize": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "summary": "",
            "feeds": [
                {"labels": {"title": "Hello", "source": "hn", "score": 12}, "time": "2024-05-01T10:00:00Z"}
            ],
            "count": 1
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = client_for(&server).query(&request()).await.unwrap();
    assert_eq!(response.count, 1);
    assert_eq!(response.feeds.len(), 1);
    assert_eq!(response.feeds[0].title(), "Hello");
    assert_eq!(response.feeds[0].labels.get("score"), Some("12"));
}

#[tokio::test]
async fn test_query_tolerates_missing_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"feeds": []})))
        .mount(&server)
        .await;

    let response = client_for(&server).query(&request()).await.unwrap();
    assert!(response.feeds.is_empty());
    assert!(response.summary.is_empty());
}

#[tokio::test]
async fn test_query_error_status_carries_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(500).set_body_string("storage offline"))
        .mount(&server)
        .await;

    let err = client_for(&server).query(&request()).await.unwrap_err();
    match err {
        ApiError::HttpStatus { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "storage offline");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_query_malformed_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let err = client_for(&server).query(&request()).await.unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)), "got {err:?}");
}

#[tokio::test]
async fn test_base_path_is_preserved() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/backend/query_config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"scrape": {}})))
        .expect(1)
        .mount(&server)
        .await;

    let client =
        BackendClient::new(&format!("{}/backend", server.uri()), Duration::from_secs(5)).unwrap();
    let config = client.query_config().await.unwrap();
    assert_eq!(config, json!({"scrape": {}}));
}

#[tokio::test]
async fn test_apply_config_sends_document_and_accepts_empty_body() {
    let server = MockServer::start().await;
    let doc = json!({"scrape": {"sources": [{"name": "hn", "rss": {"url": "https://news.ycombinator.com/rss"}}]}});
    Mock::given(method("POST"))
        .and(path("/apply_config"))
        .and(body_json(doc.clone()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server).apply_config(&doc).await.unwrap();
}

#[tokio::test]
async fn test_apply_config_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/apply_config"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid route"))
        .mount(&server)
        .await;

    let err = client_for(&server).apply_config(&json!({})).await.unwrap_err();
    assert!(err.to_string().contains("invalid route"));
}

#[tokio::test]
async fn test_unreachable_backend() {
    // Bind and drop to get a port with nothing listening.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let client = BackendClient::new(&format!("http://127.0.0.1:{port}"), Duration::from_secs(5))
        .unwrap();
    let err = client.query(&request()).await.unwrap_err();
    assert!(matches!(err, ApiError::Unreachable(_)), "got {err:?}");
}

#[tokio::test]
async fn test_query_null_feeds_is_empty_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"summary": "", "feeds": null, "count": 0})),
        )
        .mount(&server)
        .await;

    let response = client_for(&server).query(&request()).await.unwrap();
    assert!(response.feeds.is_empty());
    assert_eq!(response.count, 0);
}
