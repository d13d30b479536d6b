use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use poker_store::SessionStore;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::hub::BroadcastHub;
use crate::service::SessionService;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Per-subscriber queue depth; a full queue drops the subscriber.
    pub max_send_queue: usize,
    pub send_timeout: Duration,
    pub heartbeat_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 9191,
            max_send_queue: 256,
            send_timeout: Duration::from_secs(5),
            heartbeat_interval: Duration::from_secs(30),
        }
    }
}

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SessionService>,
    pub config: Arc<ServerConfig>,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/sessions", post(handlers::create_session))
        .route("/sessions/{id}", get(handlers::get_session))
        .route("/sessions/{id}/join", post(handlers::join))
        .route("/sessions/{id}/players/{player}", delete(handlers::remove_player))
        .route("/sessions/{id}/start", post(handlers::start_round))
        .route("/sessions/{id}/archive", post(handlers::archive_round))
        .route("/sessions/{id}/vote", post(handlers::vote))
        .route("/sessions/{id}/rollback-vote", post(handlers::rollback_vote))
        .route("/sessions/{id}/reveal", post(handlers::reveal))
        .route("/sessions/{id}/results", get(handlers::results))
        .route("/sessions/{id}/round-started", get(handlers::round_started))
        .route("/sessions/{id}/rounds/{round_id}", get(handlers::get_round))
        .route("/sessions/{id}/stories", post(handlers::add_story))
        .route("/sessions/{id}/stories/{index}", delete(handlers::remove_story))
        .route("/sessions/{id}/stories/{index}/tasks", post(handlers::add_task))
        .route("/sessions/{id}/ws", get(handlers::subscribe))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind and serve. Returns once the listener is up.
pub async fn start(
    config: ServerConfig,
    store: Arc<dyn SessionStore>,
) -> Result<ServerHandle, std::io::Error> {
    let hub = Arc::new(BroadcastHub::new(config.max_send_queue));
    let service = Arc::new(SessionService::new(store, Arc::clone(&hub)));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    let router = build_router(AppState {
        service,
        config: Arc::new(config),
    });

    tracing::info!(addr = %local_addr, "poker server started");

    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "server stopped");
        }
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        hub,
        _server: server,
    })
}

/// Handle returned by `start()`. Dropping it leaves the server running.
pub struct ServerHandle {
    pub port: u16,
    pub hub: Arc<BroadcastHub>,
    _server: tokio::task::JoinHandle<()>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    sessions: usize,
    subscribers: usize,
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let stats = state.service.hub().stats();
    Json(HealthResponse {
        status: "healthy",
        sessions: stats.sessions,
        subscribers: stats.subscribers,
    })
}
