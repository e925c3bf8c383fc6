//! Speech token issuance.
//!
//! The browser speech SDK needs a short-lived token; the gateway mints one
//! from a configured signing secret so the secret itself never reaches the
//! client.

use axum::{Json, extract::State, http::StatusCode};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::error;

use crate::state::AppState;

/// Token lifetime in seconds.
const TOKEN_TTL_SECS: u64 = 600;

#[derive(Debug, Serialize, Deserialize)]
struct SpeechClaims {
    iss: String,
    region: String,
    iat: u64,
    exp: u64,
}

/// Issue a short-lived speech token for the browser client.
pub async fn speech_token(
    State(state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let (Some(secret), Some(region)) = (
        state.config.speech_signing_secret.as_deref(),
        state.config.speech_region.as_deref(),
    ) else {
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "speech token issuance is not configured" })),
        ));
    };

    let now = std::time::SystemTime::now()
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let claims = SpeechClaims {
        iss: "glovebox-gateway".to_string(),
        region: region.to_string(),
        iat: now,
        exp: now + TOKEN_TTL_SECS,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| {
        error!(error = %e, "failed to sign speech token");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "failed to sign speech token" })),
        )
    })?;

    Ok(Json(json!({ "token": token, "region": region })))
}
