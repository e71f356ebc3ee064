//! HTTP gateway for Quillpad.
//!
//! Exposes the streaming chat endpoint and a health check:
//!
//! - `POST /v1/chat` — send a message, receive an SSE event stream
//! - `GET  /health`  — liveness probe
//!
//! Built on Axum. Authentication is bearer-token based; tokens map to
//! actors in configuration and every authenticated failure is a plain
//! JSON error before any stream bytes are sent.

pub mod chat;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::{Router, http::StatusCode, response::Json, routing::get, routing::post};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tracing::info;

use quillpad_config::AppConfig;
use quillpad_core::error::ModelError;
use quillpad_core::model::ModelGateway;
use quillpad_core::store::{ChatStore, DocumentStore};
use quillpad_core::tool::ToolRegistry;
use quillpad_store::{ChatLocks, SqliteStore};

/// Resolves a model identifier to the gateway that serves it.
///
/// A seam for tests; production routing lives in `quillpad-providers`.
pub trait GatewayResolver: Send + Sync {
    fn resolve(&self, model: &str) -> Result<Arc<dyn ModelGateway>, ModelError>;
}

/// Config-driven resolver using prefix-family classification.
pub struct ConfigResolver {
    config: AppConfig,
}

impl ConfigResolver {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }
}

impl GatewayResolver for ConfigResolver {
    fn resolve(&self, model: &str) -> Result<Arc<dyn ModelGateway>, ModelError> {
        quillpad_providers::gateway_for(model, &self.config)
    }
}

/// Shared application state for the gateway.
pub struct GatewayState {
    pub config: AppConfig,
    pub chat_store: Arc<dyn ChatStore>,
    pub document_store: Arc<dyn DocumentStore>,
    pub tools: Arc<ToolRegistry>,
    pub resolver: Arc<dyn GatewayResolver>,
    pub chat_locks: Arc<ChatLocks>,
}

pub type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/v1/chat", post(chat::chat_handler))
        .layer(DefaultBodyLimit::max(1024 * 1024)) // 1 MB body limit
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server with production wiring.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(SqliteStore::new(&config.store.database_path).await?);
    let tools = Arc::new(quillpad_tools::default_registry(store.clone()));
    let resolver = Arc::new(ConfigResolver::new(config.clone()));

    let state = Arc::new(GatewayState {
        config: config.clone(),
        chat_store: store.clone(),
        document_store: store,
        tools,
        resolver,
        chat_locks: Arc::new(ChatLocks::new()),
    });

    let app = build_router(state);
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "Quillpad gateway listening");
    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Plain JSON error body for pre-stream failures.
#[derive(Serialize)]
pub(crate) struct ErrorResponse {
    pub error: String,
}

pub(crate) fn error_response(
    status: StatusCode,
    message: impl Into<String>,
) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}
