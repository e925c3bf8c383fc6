//! Shared application state.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::core::relay::RelaySettings;
use crate::core::tools::ToolRegistry;

/// State shared by every handler: the configuration, the frozen tool
/// registry and the relay settings derived from both.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub tools: Arc<ToolRegistry>,
    pub relay: Arc<RelaySettings>,
}

impl AppState {
    pub fn new(config: ServerConfig, tools: ToolRegistry, instructions: &str) -> Self {
        let relay = Arc::new(config.relay_settings(instructions));
        Self {
            config: Arc::new(config),
            tools: Arc::new(tools),
            relay,
        }
    }
}
