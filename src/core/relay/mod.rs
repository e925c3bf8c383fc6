//! Realtime relay between browser clients and the model service.
//!
//! One [`SessionRelay`] per conversation: it owns the client WebSocket and a
//! paired upstream WebSocket, pumps both directions concurrently, rewrites
//! session configuration on the way out and intercepts function-call events
//! on the way in. Pure message transforms live in [`rewrite`]; the protocol
//! types the relay touches live in [`messages`].

pub mod config;
pub mod messages;
pub mod rewrite;
pub mod session;
pub mod upstream;

use thiserror::Error;

pub use config::{DEFAULT_REALTIME_MODEL, RealtimeVoice, RelaySettings};
pub use session::{RelayState, SessionRelay};

/// Transport-level relay failures.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The configured model-service endpoint is not a usable WebSocket URL
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// The upstream connection could not be opened
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
}
