//! HTTP and WebSocket handlers.
//!
//! The upgrade handler is the session supervisor: it accepts `GET
//! /ws/:id`, wraps the socket and runs one [`Session`](crate::session::Session)
//! per connection on its own task.

use crate::config::Config;
use crate::metrics::{self, SessionMetricsGuard};
use crate::session::{run_session, SessionContext};
use anyhow::Result;
use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, WebSocket, WebSocketUpgrade},
        ConnectInfo, Path, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use shuttle_core::{ConnectionRegistry, MemoryStore, PresenceError, UserId};
use shuttle_transport::AxumConnection;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

/// Shared server state.
pub struct AppState {
    /// Collaborators handed to every session.
    pub sessions: SessionContext,
    /// Server configuration.
    pub config: Config,
}

impl AppState {
    /// Create app state backed by an in-memory store seeded from `config`.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let store = Arc::new(MemoryStore::with_users(config.directory.users.clone()));
        info!(users = store.len(), "User directory loaded");
        Self::with_store(config, store)
    }

    /// Create app state around an existing store.
    #[must_use]
    pub fn with_store(config: Config, store: Arc<MemoryStore>) -> Self {
        let sessions =
            SessionContext::new(Arc::new(ConnectionRegistry::new()), store.clone(), store);
        Self { sessions, config }
    }

    /// The connection registry.
    #[must_use]
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.sessions.registry
    }
}

/// Build the application router.
///
/// The bare WebSocket prefix answers like the endpoint itself does for
/// non-upgrade requests, so `/ws` and `/ws/` also get `426`.
pub fn build_router(state: Arc<AppState>) -> Router {
    let base = state.config.websocket_base().to_string();
    let mut router = Router::new().route(&state.config.websocket_route(), get(ws_handler));
    if !base.is_empty() {
        router = router
            .route(&base, get(ws_prefix_handler))
            .route(&format!("{base}/"), get(ws_prefix_handler));
    }

    router
        .route("/health", get(health_handler))
        .route("/presence/:id", get(presence_handler))
        .with_state(state)
}

/// Run the HTTP/WebSocket server.
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn run_server(config: Config) -> Result<()> {
    // Start metrics server if enabled
    if config.metrics.enabled {
        if let Err(e) = metrics::start_metrics_server(config.metrics.port) {
            error!("Failed to start metrics server: {}", e);
        }
    }

    let addr = config.bind_addr()?;
    let state = Arc::new(AppState::new(config));
    let route = state.config.websocket_route();
    let app = build_router(state);

    let listener = TcpListener::bind(addr).await?;

    info!("Shuttle server listening on {}", addr);
    info!("WebSocket endpoint: ws://{}{}", addr, route);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Health check handler.
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "connections": state.registry().len(),
    }))
}

/// Presence lookup handler.
async fn presence_handler(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let user_id = UserId::from(id);

    match state.sessions.presence.fetch_status(&user_id).await {
        Ok(record) => Ok(Json(json!({
            "user_id": record.user_id,
            "status": record.status,
            "last_active_ms": record.last_active_ms(),
            "connected": state.registry().contains(user_id.as_str()),
        }))),
        Err(e @ PresenceError::UnknownUser(_)) => {
            Err((StatusCode::NOT_FOUND, Json(json!({ "error": e.to_string() }))))
        }
        Err(e) => {
            error!(user = %user_id, error = %e, "Presence lookup failed");
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": e.to_string() })),
            ))
        }
    }
}

fn upgrade_required(rejection: &WebSocketUpgradeRejection) -> Response {
    debug!(reason = %rejection.body_text(), "Rejected non-upgrade request");
    (
        StatusCode::UPGRADE_REQUIRED,
        [(header::UPGRADE, "websocket")],
        "WebSocket upgrade required",
    )
        .into_response()
}

/// The WebSocket prefix without a user ID.
async fn ws_prefix_handler(ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>) -> Response {
    match ws {
        Ok(_) => StatusCode::NOT_FOUND.into_response(),
        Err(rejection) => upgrade_required(&rejection),
    }
}

/// WebSocket upgrade handler.
///
/// Any request that is not a valid upgrade is answered with
/// `426 Upgrade Required` before a session is created.
async fn ws_handler(
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    Path(id): Path<String>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => {
            debug!(user = %id, "WebSocket route hit without upgrade");
            return upgrade_required(&rejection);
        }
    };

    ws.max_message_size(state.config.limits.max_message_size)
        .on_upgrade(move |socket| {
            let remote = connect_info.map(|ConnectInfo(addr)| addr);
            handle_websocket(socket, UserId::from(id), remote, state)
        })
}

/// Supervise one upgraded connection.
async fn handle_websocket(
    socket: WebSocket,
    user_id: UserId,
    remote: Option<SocketAddr>,
    state: Arc<AppState>,
) {
    let session_metrics = SessionMetricsGuard::start();

    debug!(user = %user_id, "WebSocket upgraded");

    let mut conn =
        AxumConnection::new(socket).with_max_message_size(state.config.limits.max_message_size);
    if let Some(addr) = remote {
        conn = conn.with_remote_addr(addr);
    }
    let end = run_session(conn, user_id.clone(), &state.sessions).await;
    session_metrics.finish(end.as_str());

    debug!(user = %user_id, reason = end.as_str(), "WebSocket session finished");
}
