//! Realtime relay WebSocket handler.
//!
//! The front door of the gateway: upgrades the client connection and hands
//! it to a fresh [`SessionRelay`], which opens the paired upstream connection
//! and pumps both directions until either side closes.

use axum::{
    extract::{State, WebSocketUpgrade, ws::WebSocket},
    response::Response,
};
use tracing::info;

use crate::core::relay::SessionRelay;
use crate::state::AppState;

/// Maximum WebSocket frame size (10 MB)
const MAX_WS_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// Maximum WebSocket message size (10 MB)
const MAX_WS_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// Upgrade the client connection and spawn a relay session for it.
pub async fn realtime_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    info!("realtime WebSocket connection upgrade requested");

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_realtime_socket(socket, state))
}

async fn handle_realtime_socket(socket: WebSocket, state: AppState) {
    let relay = SessionRelay::new(state.tools.clone(), state.relay.clone());
    relay.run(socket).await;
}
