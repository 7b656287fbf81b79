#![allow(dead_code)]

use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use towermap_api::config::ServerConfig;
use towermap_api::router::build_app_router;
use towermap_api::state::AppState;
use towermap_core::session::EditorSession;
use towermap_core::store::AnnotationStore;

/// A minimal map page with a named map instance.
pub const TEST_PAGE: &str = "<!DOCTYPE html>\n<html>\n<body>\n<div id=\"map\"></div>\n<script>\nvar map_test = L.map(\"map\");\n</script>\n</body>\n</html>\n";

/// Build a test `ServerConfig` with safe defaults.
///
/// Saved documents go to `output_dir`; the map document and annotations
/// file paths are never read because tests build the session directly.
pub fn test_config(output_dir: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5000".to_string()],
        request_timeout_secs: 30,
        map_document: PathBuf::from("map.html"),
        annotations_file: output_dir.join("annotations.json"),
        output_dir: output_dir.to_path_buf(),
    }
}

/// Build the full application router over an in-memory session on
/// [`TEST_PAGE`].
pub fn build_test_app(output_dir: &Path) -> Router {
    let session = EditorSession::new(TEST_PAGE, AnnotationStore::in_memory());
    build_test_app_with(session, output_dir)
}

pub fn build_test_app_with(session: EditorSession, output_dir: &Path) -> Router {
    let config = test_config(output_dir);
    let state = AppState::new(session, config.clone());
    build_app_router(state, &config)
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn delete(app: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_empty(app: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, json_request(Method::POST, uri, body)).await
}

pub async fn patch_json(app: &Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, json_request(Method::PATCH, uri, body)).await
}

fn json_request(method: Method, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}
