//! Tool registry shared by all relay sessions.
//!
//! Agent modules register their tools once during process startup. After that
//! the registry is frozen behind an `Arc` and read concurrently by every
//! session without locking.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use super::args::ToolArgs;
use super::invoker::{ToolError, ToolOutcome};

/// Capability interface implemented by every tool.
///
/// Handlers receive the parsed argument view and must report every failure
/// through their return value. A handler that cannot complete its side effect
/// returns `Err(ToolError)`; the invoker converts that into a spoken apology
/// rather than letting it reach the relay's pump loop.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, args: ToolArgs) -> Result<ToolOutcome, ToolError>;
}

/// One registered tool: its advertised schema and its handler.
#[derive(Clone)]
pub struct ToolDescriptor {
    /// Unique tool name, the key the model service calls it by
    pub name: String,
    /// JSON schema advertised verbatim in the session configuration
    pub schema: Value,
    /// Handler executed once per call id
    pub handler: Arc<dyn ToolHandler>,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, schema: Value, handler: Arc<dyn ToolHandler>) -> Self {
        Self {
            name: name.into(),
            schema,
            handler,
        }
    }
}

impl std::fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Registration errors. These are programmer errors caught at startup; the
/// process refuses to start rather than serving a half-built tool set.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("tool `{0}` is already registered")]
    Duplicate(String),
}

/// Mapping from tool name to descriptor. Built once, then frozen.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolDescriptor>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Fails if the name is taken.
    pub fn register(&mut self, descriptor: ToolDescriptor) -> Result<(), RegistryError> {
        if self.tools.contains_key(&descriptor.name) {
            return Err(RegistryError::Duplicate(descriptor.name));
        }
        tracing::debug!(tool = %descriptor.name, "registered tool");
        self.tools.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    /// Look up a tool by name.
    pub fn lookup(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name)
    }

    /// All advertised schemas, for injection into the session configuration.
    pub fn schemas(&self) -> Vec<Value> {
        self.tools.values().map(|t| t.schema.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
