//! Realtime WebSocket route configuration
//!
//! # Endpoint
//!
//! `GET /realtime` - WebSocket upgrade for the realtime relay
//!
//! # Protocol
//!
//! After the upgrade the connection speaks the model service's JSON event
//! protocol. The relay rewrites the client's `session.update` to advertise
//! the registered tools and the fixed assistant instructions, intercepts
//! function-call events, and passes everything else through unmodified.

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::realtime::realtime_handler;
use crate::state::AppState;

/// Create the Realtime WebSocket router
pub fn create_realtime_router() -> Router<AppState> {
    Router::new()
        .route("/realtime", get(realtime_handler))
        .layer(TraceLayer::new_for_http())
}
