//! # Chat API
//!
//! HTTP transport for the conversational backend.
//!
//! ## Endpoints
//!
//! - `POST /chat` - Send a message, get the assistant reply
//! - `POST /sessions` - Create an empty session
//! - `GET /sessions` - List sessions (`?skip=&limit=`)
//! - `GET /sessions/:id` - Fetch one session
//! - `DELETE /sessions/:id` - Delete a session and its messages
//! - `GET /sessions/:id/messages` - Message history (`?skip=&limit=`)
//! - `GET /health` - Liveness
//! - `GET /metrics` - Prometheus metrics
//! - `GET /stats` - JSON stats
//!
//! ## Example
//!
//! ```no_run
//! use memocha::api::{create_router, AppState};
//! use memocha::config::MemochaConfig;
//! use memocha::llm::GenerationClient;
//! use memocha::store::InMemoryStore;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Arc::new(MemochaConfig::default());
//! let llm = Arc::new(GenerationClient::from_config(&config, reqwest::Client::new()));
//! let state = Arc::new(AppState::new(config, Arc::new(InMemoryStore::new()), llm));
//!
//! let app = create_router(state);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All errors are returned in OpenAI-compatible format, with one distinct
//! `code` per failure kind:
//! ```json
//! {
//!   "error": {
//!     "message": "LLM service is temporarily unavailable. Please try again later.",
//!     "type": "server_error",
//!     "code": "service_unavailable"
//!   }
//! }
//! ```

mod chat;
mod health;
mod sessions;
pub mod types;

pub use types::*;

use crate::config::MemochaConfig;
use crate::llm::GenerationClient;
use crate::metrics::MetricsCollector;
use crate::store::SessionStore;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Shared application state accessible to all handlers.
pub struct AppState {
    pub config: Arc<MemochaConfig>,
    pub store: Arc<dyn SessionStore>,
    pub llm: Arc<GenerationClient>,
    /// Prometheus handle and uptime clock
    pub metrics_collector: Arc<MetricsCollector>,
}

impl AppState {
    pub fn new(
        config: Arc<MemochaConfig>,
        store: Arc<dyn SessionStore>,
        llm: Arc<GenerationClient>,
    ) -> Self {
        // A second AppState in the same process (tests) can't install another recorder
        let prometheus_handle = crate::metrics::setup_metrics().unwrap_or_else(|e| {
            tracing::debug!("Metrics already initialized, creating new handle: {}", e);
            crate::metrics::PrometheusBuilder::new()
                .build_recorder()
                .handle()
        });

        Self {
            config,
            store,
            llm,
            metrics_collector: Arc::new(MetricsCollector::new(Instant::now(), prometheus_handle)),
        }
    }
}

/// Create the main API router with all endpoints configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.server.max_body_bytes;

    Router::new()
        .route("/chat", post(chat::handle))
        .route("/sessions", post(sessions::create).get(sessions::list))
        .route("/sessions/:id", get(sessions::get).delete(sessions::delete))
        .route("/sessions/:id/messages", get(sessions::messages))
        .route("/health", get(health::handle))
        .route("/metrics", get(crate::metrics::handler::metrics_handler))
        .route("/stats", get(crate::metrics::handler::stats_handler))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
