//! Shared test utilities for Memocha integration tests.
//!
//! Builds a full router whose generation provider is a wiremock server, plus
//! request/response helpers for driving it through `tower::Service`.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response};
use memocha::api::{create_router, AppState};
use memocha::config::MemochaConfig;
use memocha::llm::GenerationClient;
use memocha::store::{InMemoryStore, SessionStore};
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Configuration pointing at `base_url`, with millisecond retry delays.
pub fn test_config(base_url: &str) -> MemochaConfig {
    let mut config = MemochaConfig::default();
    config.llm.api_key = "sk-test".to_string();
    config.llm.base_url = base_url.to_string();
    config.llm.system_prompt = "You are a test assistant.".to_string();
    config.retry.base_delay_ms = 1;
    config.retry.max_delay_ms = 4;
    config
}

/// Router backed by a fresh in-memory store.
pub fn make_app(config: MemochaConfig) -> axum::Router {
    make_app_with_store(config, Arc::new(InMemoryStore::new()))
}

/// Router backed by the given store.
pub fn make_app_with_store(config: MemochaConfig, store: Arc<dyn SessionStore>) -> axum::Router {
    let config = Arc::new(config);
    let llm = Arc::new(GenerationClient::from_config(&config, reqwest::Client::new()));
    let state = Arc::new(AppState::new(config, store, llm));
    create_router(state)
}

/// OpenAI-style completion body with one choice.
pub fn completion_body(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "model": "gpt-4.1-nano",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

/// OpenAI-style error body.
pub fn error_body(message: &str) -> Value {
    json!({"error": {"message": message, "type": "test_error"}})
}

/// Mount a provider that always answers `content`.
pub async fn mount_reply(server: &MockServer, content: &str) {
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(content)))
        .mount(server)
        .await;
}

/// Mount a provider that always fails with `status`.
pub async fn mount_status(server: &MockServer, status: u16) {
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(ResponseTemplate::new(status).set_body_json(error_body("provider says no")))
        .mount(server)
        .await;
}

/// Number of completion calls the provider has seen.
pub async fn provider_calls(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .map(|requests| requests.len())
        .unwrap_or(0)
}

/// The `messages` array of the most recent completion call.
pub async fn last_sent_messages(server: &MockServer) -> Vec<(String, String)> {
    let requests = server.received_requests().await.unwrap_or_default();
    let last = requests.last().expect("provider was never called");
    let body: Value = serde_json::from_slice(&last.body).unwrap();
    body["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| {
            (
                m["role"].as_str().unwrap().to_string(),
                m["content"].as_str().unwrap().to_string(),
            )
        })
        .collect()
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn read_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn read_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
