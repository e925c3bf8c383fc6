//! Pure message rewrites applied by the relay.
//!
//! Each function takes a parsed protocol message (or a tool payload), returns
//! the transformed value, and touches nothing but the fields it owns. The
//! relay decides *when* to apply them; nothing here holds state.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Value, json};

use super::config::RelaySettings;

/// Rewrite an outbound `session.update` before it reaches the model service:
/// advertise the registered tool schemas, enforce the fixed instructions,
/// voice and temperature, and drop any conflicting client-supplied values by
/// overwriting them.
pub fn configure_session(mut message: Value, schemas: &[Value], settings: &RelaySettings) -> Value {
    let session = message
        .as_object_mut()
        .map(|m| m.entry("session").or_insert_with(|| json!({})))
        .and_then(Value::as_object_mut);

    if let Some(session) = session {
        session.insert("instructions".into(), json!(settings.instructions));
        session.insert("voice".into(), json!(settings.voice.as_str()));
        if let Some(temperature) = settings.temperature {
            session.insert("temperature".into(), json!(temperature));
        }
        let tool_choice = if schemas.is_empty() { "none" } else { "auto" };
        session.insert("tool_choice".into(), json!(tool_choice));
        session.insert("tools".into(), Value::Array(schemas.to_vec()));
    }
    message
}

/// Rewrite an inbound `session.created` before it reaches the client: the
/// negotiated instructions and tool list are internal configuration and are
/// blanked out.
pub fn scrub_session_created(mut message: Value) -> Value {
    if let Some(session) = message.get_mut("session").and_then(Value::as_object_mut) {
        session.insert("instructions".into(), json!(""));
        session.insert("tools".into(), json!([]));
        session.insert("tool_choice".into(), json!("none"));
    }
    message
}

/// Rewrite an inbound `response.done` before it reaches the client: remove
/// function call items from the response output. Returns the message and
/// whether anything was removed.
pub fn strip_tool_output(mut message: Value) -> (Value, bool) {
    let mut stripped = false;
    if let Some(output) = message
        .get_mut("response")
        .and_then(|r| r.get_mut("output"))
        .and_then(Value::as_array_mut)
    {
        let before = output.len();
        output.retain(|item| item.get("type").and_then(Value::as_str) != Some("function_call"));
        stripped = output.len() != before;
    }
    (message, stripped)
}

static BRACKETED_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[A-Za-z0-9][A-Za-z0-9._-]{0,63}\]").expect("valid literal regex"));

/// Redact knowledge-base identifiers from a payload headed to the human
/// channel, per the product rule that keys are never read aloud.
///
/// JSON payloads lose their `chunk_id`/`key` fields; plain text loses
/// bracketed citation markers such as `[report_2024.pdf_page_3]`.
pub fn redact_source_keys(payload: &str) -> String {
    if let Ok(mut value) = serde_json::from_str::<Value>(payload) {
        redact_value(&mut value);
        return value.to_string();
    }
    BRACKETED_KEY.replace_all(payload, "").into_owned()
}

fn redact_value(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.remove("chunk_id");
            map.remove("key");
            for v in map.values_mut() {
                redact_value(v);
            }
        }
        Value::Array(items) => {
            for v in items.iter_mut() {
                redact_value(v);
            }
        }
        _ => {}
    }
}
