//! Shared helpers for prdkit-proxy integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use http_body_util::BodyExt;
use prdkit_core::ports::testing::ScriptedBackend;
use prdkit_core::{ModelSelection, ModelSource};
use prdkit_proxy::{AppState, create_router};
use tokio::net::TcpListener;

/// NDJSON body with one event per fragment and a final `done` event.
pub fn ndjson(fragments: &[&str]) -> String {
    let mut body = String::new();
    for fragment in fragments {
        body.push_str(&serde_json::json!({ "response": fragment, "done": false }).to_string());
        body.push('\n');
    }
    body.push_str(&serde_json::json!({ "response": "", "done": true }).to_string());
    body.push('\n');
    body
}

pub fn selection(name: &str) -> ModelSelection {
    ModelSelection {
        name: name.to_string(),
        source: ModelSource::Preferred,
    }
}

/// Router backed by a scripted backend targeting `llama3.2`.
pub fn app(backend: &Arc<ScriptedBackend>) -> Router {
    let state = AppState::new(backend.clone(), selection("llama3.2"));
    create_router(state, None)
}

pub fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn spawn_server(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{addr}")
}

/// A base URL nothing is listening on.
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}
