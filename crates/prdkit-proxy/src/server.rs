//! Axum HTTP server for the PRD workbench.
//!
//! This module provides the `serve()` function that runs the server on a
//! pre-bound `TcpListener`, and `start_server()` which binds one from a
//! [`ServerConfig`].

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::info;

use prdkit_core::{
    DEFAULT_BACKEND_TIMEOUT, DEFAULT_GENERATE_URL, DEFAULT_PORT, GenerationOptions,
    ModelPreference,
};

use crate::handlers;
use crate::ollama::{OllamaClient, tags_url_for};
use crate::state::{AppState, DEFAULT_CHANNEL_CAPACITY};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port for the HTTP server.
    pub port: u16,
    /// Interface to bind.
    pub host: String,
    /// Ollama-compatible generate endpoint.
    pub generate_url: String,
    /// Ollama model listing endpoint.
    pub tags_url: String,
    /// Preferred and fallback model names.
    pub models: ModelPreference,
    /// Sampling options sent with every request.
    pub options: GenerationOptions,
    /// Time allowed for the response head and between chunks.
    pub backend_timeout: Duration,
    /// Fragments buffered per response before the relay waits.
    pub channel_capacity: usize,
    /// Optional path to static assets.
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            host: "0.0.0.0".to_string(),
            generate_url: DEFAULT_GENERATE_URL.to_string(),
            tags_url: tags_url_for(DEFAULT_GENERATE_URL),
            models: ModelPreference::default(),
            options: GenerationOptions::default(),
            backend_timeout: DEFAULT_BACKEND_TIMEOUT,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            static_dir: None,
        }
    }
}

impl ServerConfig {
    /// Point at a different generate endpoint. The tags URL follows it.
    #[must_use]
    pub fn with_generate_url(mut self, url: impl Into<String>) -> Self {
        self.generate_url = url.into();
        self.tags_url = tags_url_for(&self.generate_url);
        self
    }

    /// Set the preferred model.
    #[must_use]
    pub fn with_preferred_model(mut self, model: impl Into<String>) -> Self {
        self.models.preferred = model.into();
        self
    }

    /// Set the static directory to serve.
    #[must_use]
    pub fn with_static_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(path.into());
        self
    }

    /// Address string to bind, e.g. `0.0.0.0:3008`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Build the router.
///
/// API routes take priority; when `static_dir` is set, unmatched paths are
/// served from it with `index.html` as the fallback.
pub fn create_router(state: AppState, static_dir: Option<&Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/health", get(handlers::health))
        .route("/api/ping", get(handlers::ping))
        .route("/api/generate", post(handlers::generate))
        .route("/api/guided-chat", post(handlers::guided_chat))
        .route("/api/parse-brain-dump", post(handlers::parse_brain_dump))
        .with_state(state);

    let app = match static_dir {
        Some(dir) => {
            let serve_dir = ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html")));
            api.fallback_service(serve_dir)
        }
        None => api,
    };

    app.layer(cors).layer(TraceLayer::new_for_http())
}

/// Run the server on a pre-bound listener until `cancel` fires.
///
/// Probes the backend once to pick a model; an unreachable backend is not
/// fatal.
pub async fn serve(
    listener: TcpListener,
    config: ServerConfig,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let addr: SocketAddr = listener.local_addr()?;

    let client = OllamaClient::new(config.generate_url.clone())?
        .with_tags_url(config.tags_url.clone())
        .with_timeout(config.backend_timeout);

    let model = config.models.resolve(&client).await;
    info!(
        backend = %config.generate_url,
        model = %model,
        "Targeting inference backend"
    );

    let state = AppState::new(Arc::new(client), model)
        .with_options(config.options)
        .with_channel_capacity(config.channel_capacity);

    if let Some(dir) = &config.static_dir {
        info!("Serving static assets from: {}", dir.display());
    }
    let app = create_router(state, config.static_dir.as_deref());

    info!("PRD workbench listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;

    info!("Server shut down");
    Ok(())
}

/// Bind the configured address and run until `cancel` fires.
pub async fn start_server(config: ServerConfig, cancel: CancellationToken) -> anyhow::Result<()> {
    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr).await?;
    serve(listener, config, cancel).await
}
