//! Core gateway functionality: the realtime relay and the tool layer it
//! dispatches into.

pub mod relay;
pub mod tools;

// Re-export commonly used types for convenience
pub use relay::{RealtimeVoice, RelayError, RelaySettings, RelayState, SessionRelay};

pub use tools::{
    ArgError, RegistryError, ToolArgs, ToolDescriptor, ToolDirection, ToolError, ToolHandler,
    ToolInvoker, ToolOutcome, ToolRegistry,
};
