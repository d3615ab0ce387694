//! Shared utilities for integration testing.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body, Bytes},
    http::{
        header::{CONTENT_ENCODING, CONTENT_LENGTH, VARY},
        HeaderMap, Request, StatusCode,
    },
    middleware,
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use tower::ServiceExt;

use legacy_charset::charset::{Codec, DecodedForm, EncodingRsCodec};
use legacy_charset::config::CharsetConfig;
use legacy_charset::{transcode_charset, CharsetState};

/// Build a test application with the default charset configuration.
#[allow(dead_code)]
pub fn app() -> Router {
    app_with(CharsetConfig::default())
}

/// Build a test application around the given charset configuration.
#[allow(dead_code)]
pub fn app_with(config: CharsetConfig) -> Router {
    let state = Arc::new(CharsetState::from_config(&config).unwrap());
    Router::new()
        .route("/", any(|| async { "OK" }))
        .route("/zh", get(|| async { "测试" }))
        .route("/raw", get(|| async { Response::new(Body::from("OK")) }))
        .route("/empty", get(|| async { StatusCode::NO_CONTENT }))
        .route("/created", get(|| async { (StatusCode::CREATED, "测试") }))
        .route("/length", get(|| async { ([(CONTENT_LENGTH, "2")], "OK") }))
        .route("/vary", get(|| async { ([(VARY, "Accept-Encoding")], "OK") }))
        .route("/emoji", get(|| async { "smile 😀" }))
        .route(
            "/gzip",
            get(|| async { ([(CONTENT_ENCODING, "gzip")], vec![0x1F_u8, 0x8B, 0x08, 0xFF]) }),
        )
        .route(
            "/missing",
            get(|| async { (StatusCode::NOT_FOUND, Response::new(Body::from("gone"))) }),
        )
        .route("/form", any(form_echo))
        .route("/upload", any(upload_len))
        .layer(middleware::from_fn_with_state(state, transcode_charset))
}

/// Echo what the handler observes: decoded maps, query and body.
async fn form_echo(request: Request<Body>) -> impl IntoResponse {
    let decoded = request.extensions().get::<DecodedForm>().cloned();
    let query = request.uri().query().unwrap_or_default().to_string();
    let body = to_bytes(request.into_body(), usize::MAX).await.unwrap();
    let body = String::from_utf8(body.to_vec()).unwrap();

    let mut out = String::new();
    match decoded {
        Some(decoded) => {
            for (k, v) in decoded.form.pairs() {
                out.push_str(&format!("form {}={}\n", k, v));
            }
            for (k, v) in decoded.post_form.pairs() {
                out.push_str(&format!("post {}={}\n", k, v));
            }
        }
        None => out.push_str("no form\n"),
    }
    out.push_str(&format!("query {}\nbody {}\n", query, body));
    out
}

/// Answer with the number of body bytes the handler received.
async fn upload_len(request: Request<Body>) -> String {
    let body = to_bytes(request.into_body(), usize::MAX).await.unwrap();
    body.len().to_string()
}

/// Send one request through the app.
#[allow(dead_code)]
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, body)
}

/// The default legacy codec.
#[allow(dead_code)]
pub fn gbk() -> EncodingRsCodec {
    EncodingRsCodec::for_label("gb2312").unwrap()
}

/// Decode a legacy response body for assertions.
#[allow(dead_code)]
pub fn decode(body: &[u8]) -> String {
    gbk().decode(body).unwrap()
}
