//! Axum WebSocket upgrade handler.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::IntoResponse;
use axum::routing::get;

use super::connection::run_connection;
use crate::app_state::AppState;

/// `GET /ws`: Upgrade HTTP connection to WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let event_rx = state.event_bus.subscribe();
    let registry_service = Arc::clone(&state.registry_service);

    ws.on_upgrade(move |socket| run_connection(socket, event_rx, registry_service))
}

/// WebSocket route mounted at the root level.
pub fn routes() -> Router<AppState> {
    Router::new().route("/ws", get(ws_handler))
}
