//! Relay session settings.
//!
//! Everything a [`super::session::SessionRelay`] needs to open its upstream
//! connection and rewrite the session configuration: endpoint, credentials,
//! model, voice and the fixed assistant instructions.

use serde::{Deserialize, Serialize};

/// Default realtime model when none is configured.
pub const DEFAULT_REALTIME_MODEL: &str = "gpt-4o-realtime-preview";

/// Voices the realtime model service can speak with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RealtimeVoice {
    /// Default voice, matches the original deployment
    #[default]
    Alloy,
    Ash,
    Ballad,
    Coral,
    Echo,
    Sage,
    Shimmer,
    Verse,
}

impl RealtimeVoice {
    /// Convert to the API parameter value.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alloy => "alloy",
            Self::Ash => "ash",
            Self::Ballad => "ballad",
            Self::Coral => "coral",
            Self::Echo => "echo",
            Self::Sage => "sage",
            Self::Shimmer => "shimmer",
            Self::Verse => "verse",
        }
    }

    /// Parse from string, with fallback to default.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "alloy" => Self::Alloy,
            "ash" => Self::Ash,
            "ballad" => Self::Ballad,
            "coral" => Self::Coral,
            "echo" => Self::Echo,
            "sage" => Self::Sage,
            "shimmer" => Self::Shimmer,
            "verse" => Self::Verse,
            _ => Self::default(),
        }
    }
}

impl std::fmt::Display for RealtimeVoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-process relay settings, shared by every session.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    /// Model service WebSocket endpoint (wss://...)
    pub endpoint: String,
    /// API key sent as a bearer token on the upstream handshake
    pub api_key: String,
    /// Realtime model/deployment name, passed as a query parameter
    pub model: String,
    /// Voice enforced on every session configuration
    pub voice: RealtimeVoice,
    /// Fixed system instructions enforced on every session configuration
    pub instructions: String,
    /// Optional sampling temperature enforced on the session
    pub temperature: Option<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_as_str() {
        assert_eq!(RealtimeVoice::Alloy.as_str(), "alloy");
        assert_eq!(RealtimeVoice::Verse.as_str(), "verse");
    }

    #[test]
    fn test_voice_from_str() {
        assert_eq!(
            RealtimeVoice::from_str_or_default("SHIMMER"),
            RealtimeVoice::Shimmer
        );
        assert_eq!(
            RealtimeVoice::from_str_or_default("unknown"),
            RealtimeVoice::Alloy
        );
    }
}
