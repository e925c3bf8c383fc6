//! Tool argument parsing and coercion.
//!
//! The model service delivers function-call arguments as one opaque JSON
//! string, with every value potentially arriving as a string even when the
//! advertised schema says number. `ToolArgs` parses that string once at the
//! invoker boundary and gives handlers typed accessors with a single set of
//! coercion rules, so individual handlers never reimplement string-to-number
//! conversion.

use serde_json::{Map, Value};
use thiserror::Error;

/// Errors produced by typed argument accessors.
///
/// These are conversational failures: handlers turn them into corrective
/// TO_SERVER sentences rather than propagating them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgError {
    /// A required argument is absent
    #[error("missing required argument `{0}`")]
    Missing(&'static str),

    /// An argument is present but cannot be coerced to a number
    #[error("argument `{0}` must be a number")]
    NotNumeric(&'static str),

    /// An argument is present but is neither a string nor a scalar
    #[error("argument `{0}` must be a string")]
    NotText(&'static str),
}

/// Parsed view over one function call's arguments.
#[derive(Debug, Clone, Default)]
pub struct ToolArgs {
    fields: Map<String, Value>,
}

impl ToolArgs {
    /// Parse the raw argument payload from a function-call event.
    ///
    /// An empty payload is treated as an empty argument map, which the model
    /// service sends for tools that declare no parameters.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let fields: Map<String, Value> = serde_json::from_str(raw)?;
        Ok(Self { fields })
    }

    /// Build from an existing JSON object map. Test helper and agent-internal use.
    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Whether an argument was supplied at all.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Optional textual argument. Numbers and booleans are rendered to text.
    pub fn text(&self, name: &'static str) -> Result<Option<String>, ArgError> {
        match self.fields.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(Value::Bool(b)) => Ok(Some(b.to_string())),
            Some(_) => Err(ArgError::NotText(name)),
        }
    }

    /// Required textual argument.
    pub fn require_text(&self, name: &'static str) -> Result<String, ArgError> {
        self.text(name)?.ok_or(ArgError::Missing(name))
    }

    /// Optional numeric argument. Accepts JSON numbers and numeric strings.
    pub fn number(&self, name: &'static str) -> Result<Option<f64>, ArgError> {
        match self.fields.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_f64()
                .map(Some)
                .ok_or(ArgError::NotNumeric(name)),
            Some(Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map(Some)
                .map_err(|_| ArgError::NotNumeric(name)),
            Some(_) => Err(ArgError::NotNumeric(name)),
        }
    }

    /// Required numeric argument.
    pub fn require_number(&self, name: &'static str) -> Result<f64, ArgError> {
        self.number(name)?.ok_or(ArgError::Missing(name))
    }

    /// Optional list-of-text argument. Scalar items are rendered to text.
    pub fn text_list(&self, name: &'static str) -> Result<Option<Vec<String>>, ArgError> {
        match self.fields.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Array(items)) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(s) => out.push(s.clone()),
                        Value::Number(n) => out.push(n.to_string()),
                        _ => return Err(ArgError::NotText(name)),
                    }
                }
                Ok(Some(out))
            }
            Some(_) => Err(ArgError::NotText(name)),
        }
    }
}
