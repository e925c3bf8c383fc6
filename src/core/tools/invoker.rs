//! Tool invocation boundary.
//!
//! The invoker executes exactly one tool call and always produces exactly one
//! `ToolOutcome`, whatever goes wrong. Unknown tools, unparseable arguments
//! and handler failures all become short TO_SERVER sentences the model can
//! relay and recover from; nothing here returns an error to the caller.

use std::sync::Arc;

use thiserror::Error;

use super::args::ToolArgs;
use super::registry::ToolRegistry;

/// Where a tool's output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolDirection {
    /// Fed back into the model's reasoning context only
    ToServer,
    /// Also forwarded to the human-facing channel
    ToClient,
}

/// The single result of one tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutcome {
    /// Text surfaced to the model (and, for `ToClient`, to the user channel)
    pub payload: String,
    pub direction: ToolDirection,
}

impl ToolOutcome {
    pub fn to_server(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            direction: ToolDirection::ToServer,
        }
    }

    pub fn to_client(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            direction: ToolDirection::ToClient,
        }
    }

    /// Numeric result for the model. Whole numbers render without a trailing
    /// `.0` so `2 + 3` reads back as `5`.
    pub fn number(value: f64) -> Self {
        Self::to_server(format_number(value))
    }
}

/// Render a numeric tool result as speakable text.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Failures a handler may report. Converted to conversational outcomes at the
/// invoker boundary, never propagated further.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Outbound HTTP request failed (connect, timeout, TLS)
    #[error("backend request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered but the response was unusable
    #[error("{0}")]
    Backend(String),
}

/// Executes tool calls against a frozen registry.
#[derive(Debug, Clone)]
pub struct ToolInvoker {
    registry: Arc<ToolRegistry>,
}

impl ToolInvoker {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    /// Run one call. At-most-once: side effects are never retried here.
    pub async fn invoke(&self, name: &str, raw_args: &str) -> ToolOutcome {
        let Some(descriptor) = self.registry.lookup(name) else {
            tracing::warn!(tool = %name, "call for unregistered tool");
            return ToolOutcome::to_server(format!(
                "The tool {name} is not available. Please answer without it."
            ));
        };

        let args = match ToolArgs::parse(raw_args) {
            Ok(args) => args,
            Err(e) => {
                tracing::warn!(tool = %name, error = %e, "unparseable tool arguments");
                return ToolOutcome::to_server(
                    "The tool arguments could not be read. Please retry the call \
                     with valid arguments.",
                );
            }
        };

        match descriptor.handler.call(args).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(tool = %name, error = %e, "tool handler failed");
                ToolOutcome::to_server(format!(
                    "The {name} tool failed temporarily. Please try again later."
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tools::registry::{ToolDescriptor, ToolHandler};
    use async_trait::async_trait;
    use serde_json::json;

    struct Adder;

    #[async_trait]
    impl ToolHandler for Adder {
        async fn call(&self, args: ToolArgs) -> Result<ToolOutcome, ToolError> {
            let a = match args.require_number("A") {
                Ok(v) => v,
                Err(e) => return Ok(ToolOutcome::to_server(format!("{e}. Please retry."))),
            };
            let b = match args.require_number("B") {
                Ok(v) => v,
                Err(e) => return Ok(ToolOutcome::to_server(format!("{e}. Please retry."))),
            };
            Ok(ToolOutcome::number(a + b))
        }
    }

    struct Faulty;

    #[async_trait]
    impl ToolHandler for Faulty {
        async fn call(&self, _args: ToolArgs) -> Result<ToolOutcome, ToolError> {
            Err(ToolError::Backend("simulated outage".into()))
        }
    }

    fn invoker() -> ToolInvoker {
        let mut registry = ToolRegistry::new();
        registry
            .register(ToolDescriptor::new("add", json!({}), Arc::new(Adder)))
            .unwrap();
        registry
            .register(ToolDescriptor::new("faulty", json!({}), Arc::new(Faulty)))
            .unwrap();
        ToolInvoker::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn test_invoke_with_string_arguments() {
        let outcome = invoker().invoke("add", r#"{"A": "2", "B": "3"}"#).await;
        assert_eq!(outcome.payload, "5");
        assert_eq!(outcome.direction, ToolDirection::ToServer);
    }

    #[tokio::test]
    async fn test_invoke_with_numeric_arguments() {
        let outcome = invoker().invoke("add", r#"{"A": 2, "B": 3}"#).await;
        assert_eq!(outcome.payload, "5");
    }

    #[tokio::test]
    async fn test_unknown_tool_is_conversational() {
        let outcome = invoker().invoke("does_not_exist", "{}").await;
        assert_eq!(outcome.direction, ToolDirection::ToServer);
        assert!(outcome.payload.contains("not available"));
    }

    #[tokio::test]
    async fn test_bad_json_is_conversational() {
        let outcome = invoker().invoke("add", "not json at all").await;
        assert_eq!(outcome.direction, ToolDirection::ToServer);
        assert!(outcome.payload.contains("retry"));
    }

    #[tokio::test]
    async fn test_handler_failure_yields_single_outcome() {
        let outcome = invoker().invoke("faulty", "{}").await;
        assert_eq!(outcome.direction, ToolDirection::ToServer);
        assert!(outcome.payload.contains("try again later"));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(5.0), "5");
        assert_eq!(format_number(-2.0), "-2");
        assert_eq!(format_number(0.1), "0.1");
        assert_eq!(format_number(2.5), "2.5");
    }
}
