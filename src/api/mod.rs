//! REST API and WebSocket server for the ingestion hub
//!
//! This module exposes the ingestion pipeline over HTTP and lets observers
//! subscribe to the broadcast hub over WebSocket.
//!
//! ## Architecture
//!
//! - **Axum** web framework with Tower middleware
//! - **Pipeline + actor handles** in shared state
//! - **WebSocket** observers registered with the broadcast hub
//!
//! ## Endpoints
//!
//! - `POST /api/v1/resource` - Submit a resource sample
//! - `GET /api/v1/health` - Health check
//! - `GET /api/v1/stats` - Hub, replay and storage statistics
//! - `GET /api/v1/history` - Latest samples for a host
//! - `GET /api/v1/alerts` - Alert listing
//! - `POST /api/v1/alerts/:id/resolve` - Mark an alert resolved
//! - `WS /ws/resources` - Real-time resource updates and alerts

pub mod error;
pub mod routes;
pub mod state;
pub mod types;
pub mod websocket;

pub use error::{ApiError, ApiResult};
pub use state::ApiState;
pub use types::{
    AlertsResponse, BufferedResponse, HealthResponse, HistoryResponse, ResolveResponse,
    StatsResponse,
};

use std::net::SocketAddr;

use axum::{
    Router,
    routing::{get, post},
};
use tracing::info;

use crate::config::ApiSettings;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind address (e.g., "0.0.0.0:8080")
    pub bind_addr: SocketAddr,

    /// Enable CORS for browser dashboards
    pub enable_cors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiSettings::default().into()
    }
}

impl From<ApiSettings> for ApiConfig {
    fn from(settings: ApiSettings) -> Self {
        Self {
            bind_addr: settings.bind,
            enable_cors: settings.enable_cors,
        }
    }
}

/// Build the router with all routes and layers
pub fn router(config: &ApiConfig, state: ApiState) -> Router {
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::trace::TraceLayer;

    let mut app = Router::new()
        .route("/api/v1/resource", post(routes::resources::ingest_sample))
        .route("/api/v1/history", get(routes::resources::get_history))
        .route("/api/v1/alerts", get(routes::alerts::list_alerts))
        .route(
            "/api/v1/alerts/:id/resolve",
            post(routes::alerts::resolve_alert),
        )
        .route("/api/v1/health", get(routes::health::health_check))
        .route("/api/v1/stats", get(routes::stats::get_stats))
        .route("/ws/resources", get(websocket::websocket_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    app
}

/// Spawn the API server
///
/// This starts an Axum HTTP server in a background task.
/// Returns the server's local address.
pub async fn spawn_api_server(config: ApiConfig, state: ApiState) -> anyhow::Result<SocketAddr> {
    info!("starting API server on {}", config.bind_addr);

    let app = router(&config, state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let addr = listener.local_addr()?;

    info!("API server listening on {}", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(addr)
}
