//! Model-service protocol types the relay touches.
//!
//! The duplex protocol is JSON events tagged by a `type` field. The relay is
//! deliberately not a full codec for it: only the event kinds it intercepts
//! are modeled here, everything else crosses the relay as raw text so unknown
//! kinds survive unmodified (forward-compatibility contract).
//!
//! Intercepted inbound kinds (upstream -> client direction):
//! - `session.created` - scrubbed before forwarding
//! - `conversation.item.created` / `response.output_item.added` - function
//!   call announcements, tracked and swallowed
//! - `response.function_call_arguments.delta` - swallowed
//! - `response.function_call_arguments.done` - triggers tool dispatch
//! - `response.output_item.done` - function call items swallowed
//! - `response.done` - function call output stripped
//!
//! Intercepted outbound kinds (client -> upstream direction):
//! - `session.update` - tool schemas and instructions injected
//!
//! Synthesized outbound kinds:
//! - `conversation.item.create` carrying a `function_call_output` item
//! - `response.create`
//! - `extension.middle_tier_tool_response` (to the client only)

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Read the event kind out of a parsed protocol message.
pub fn event_type(message: &Value) -> Option<&str> {
    message.get("type").and_then(Value::as_str)
}

/// The slice of a conversation item the relay inspects.
#[derive(Debug, Clone, Deserialize)]
pub struct EventItem {
    /// Item kind: "message", "function_call", "function_call_output", ...
    #[serde(rename = "type")]
    pub item_type: String,
    /// Call correlator, present on function call items
    #[serde(default)]
    pub call_id: Option<String>,
    /// Tool name, present on function call announcements
    #[serde(default)]
    pub name: Option<String>,
    /// Complete argument payload, present on finished function call items
    #[serde(default)]
    pub arguments: Option<String>,
}

impl EventItem {
    /// Extract the `item` object from a protocol message, if any.
    pub fn from_message(message: &Value) -> Option<Self> {
        let item = message.get("item")?;
        serde_json::from_value(item.clone()).ok()
    }

    pub fn is_function_call(&self) -> bool {
        self.item_type == "function_call"
    }

    pub fn is_function_call_output(&self) -> bool {
        self.item_type == "function_call_output"
    }
}

/// Fields of `response.function_call_arguments.done` the relay consumes.
#[derive(Debug, Clone, Deserialize)]
pub struct FunctionCallArgumentsDone {
    pub call_id: String,
    pub arguments: String,
}

/// `conversation.item.create` carrying a tool result, written upstream once
/// per resolved call.
#[derive(Debug, Clone, Serialize)]
pub struct FunctionOutputEvent {
    #[serde(rename = "type")]
    event_type: &'static str,
    item: FunctionOutputItem,
}

#[derive(Debug, Clone, Serialize)]
struct FunctionOutputItem {
    #[serde(rename = "type")]
    item_type: &'static str,
    call_id: String,
    output: String,
}

impl FunctionOutputEvent {
    pub fn new(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            event_type: "conversation.item.create",
            item: FunctionOutputItem {
                item_type: "function_call_output",
                call_id: call_id.into(),
                output: output.into(),
            },
        }
    }
}

/// `response.create`, asking the model to keep generating after a tool
/// result has been injected.
pub fn response_create() -> Value {
    serde_json::json!({ "type": "response.create" })
}

/// Tool result surfaced on the human-facing channel. The client renders this
/// outside the model service's own event space, hence the extension prefix.
#[derive(Debug, Clone, Serialize)]
pub struct ToolResponseEvent {
    #[serde(rename = "type")]
    event_type: &'static str,
    pub tool_name: String,
    pub tool_result: String,
}

impl ToolResponseEvent {
    pub fn new(tool_name: impl Into<String>, tool_result: impl Into<String>) -> Self {
        Self {
            event_type: "extension.middle_tier_tool_response",
            tool_name: tool_name.into(),
            tool_result: tool_result.into(),
        }
    }
}

/// Connection-level error surfaced to the client before closing.
#[derive(Debug, Clone, Serialize)]
pub struct RelayErrorEvent {
    #[serde(rename = "type")]
    event_type: &'static str,
    pub code: String,
    pub message: String,
}

impl RelayErrorEvent {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            event_type: "error",
            code: code.into(),
            message: message.into(),
        }
    }
}
