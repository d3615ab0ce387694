//! Demo HTTP server hosting the charset middleware.
//!
//! # Responsibilities
//! - Create the Axum Router with the demo handler
//! - Wire up middleware (tracing, timeout, charset transcoding)
//! - Bind server to listener and shut down on Ctrl+C

use axum::{
    body::{to_bytes, Body},
    http::Request,
    middleware,
    routing::any,
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::charset::{CharsetError, DecodedForm};
use crate::config::AppConfig;
use crate::http::middleware::{transcode_charset, CharsetState};

/// Body returned by the demo handler.
pub const GREETING: &str = "测试";

const FORM_LIMIT: usize = 64 * 1024;

/// HTTP server for the demo application.
pub struct HttpServer {
    router: Router,
    config: AppConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: AppConfig) -> Result<Self, CharsetError> {
        let state = Arc::new(CharsetState::from_config(&config.charset)?);
        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, state: Arc<CharsetState>) -> Router {
        app(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.server.request_timeout_secs)))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            charset = %self.config.charset.charset,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

/// The demo routes behind the charset middleware.
pub fn app(state: Arc<CharsetState>) -> Router {
    Router::new()
        .route("/", any(index))
        .layer(middleware::from_fn_with_state(state, transcode_charset))
}

/// Logs whatever form data arrived, in UTF-8, and answers with a fixed
/// Chinese greeting.
async fn index(request: Request<Body>) -> &'static str {
    if let Some(decoded) = request.extensions().get::<DecodedForm>() {
        tracing::info!(form = ?decoded.form, post_form = ?decoded.post_form, "Decoded legacy form");
        return GREETING;
    }

    let query: Vec<(String, String)> = form_urlencoded::parse(request.uri().query().unwrap_or_default().as_bytes())
        .into_owned()
        .collect();
    match to_bytes(request.into_body(), FORM_LIMIT).await {
        Ok(body) => {
            let post: Vec<(String, String)> = form_urlencoded::parse(&body).into_owned().collect();
            tracing::info!(query = ?query, post_form = ?post, "Form");
        }
        Err(e) => tracing::warn!(error = %e, "Failed to read request body"),
    }
    GREETING
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
