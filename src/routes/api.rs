use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::{api, speech};
use crate::state::AppState;

/// Create the plain API router: health check and speech token issuance.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(api::health_check))
        .route("/speech/token", get(speech::speech_token))
        .layer(TraceLayer::new_for_http())
}
