//! Notepad agent: note files kept by an external document service.
//!
//! The note backend is reached over plain HTTP POST with JSON bodies; its
//! endpoints come from configuration. Failures are reported to the model as
//! "try again later" and are never retried here.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::core::RegistryError;
use crate::core::tools::{
    ToolArgs, ToolDescriptor, ToolError, ToolHandler, ToolOutcome, ToolRegistry,
};

/// Endpoints of the note-file backend.
#[derive(Debug, Clone)]
pub struct NotepadConfig {
    /// Base URL of the note storage the backend operates on
    pub base_url: String,
    /// Endpoint appending text to a session's note file
    pub append_url: String,
    /// Endpoint replacing placeholder text inside a file
    pub replace_url: String,
    /// Endpoint resolving a keyword to a file name
    pub lookup_url: String,
}

fn is_float(value: &str) -> bool {
    value.trim().parse::<f64>().is_ok()
}

fn is_digits(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

/// Pick the placeholder pattern to replace from the supplied parameters.
///
/// Note files carry placeholders for reaction conditions: `xh` for a duration
/// in hours, `yC` for a temperature in Celsius, `xhyC` for both. Returns
/// `(old_text, new_text)` or a corrective sentence for the model.
pub fn replacement_patterns(
    temperature: Option<&str>,
    hours: Option<&str>,
) -> Result<(String, String), String> {
    match (temperature, hours) {
        (None, None) => Err("No parameters provided to modify the file. Please retry".into()),
        (None, Some(hours)) => {
            if is_digits(hours) {
                Ok(("xh".into(), format!("{hours}h")))
            } else {
                Err("No valid parameter provided for the hours. Please retry".into())
            }
        }
        (Some(temperature), None) => {
            if is_float(temperature) {
                Ok(("yC".into(), format!("{temperature}C")))
            } else {
                Err("No valid parameter provided for the temperature. Please retry".into())
            }
        }
        (Some(temperature), Some(hours)) => {
            if is_digits(hours) && is_float(temperature) {
                Ok(("xhyC".into(), format!("{hours}h{temperature}C")))
            } else {
                Err("No valid parameter provided for temperature and hours. Please retry".into())
            }
        }
    }
}

struct SaveNote {
    http: reqwest::Client,
    config: NotepadConfig,
}

#[async_trait]
impl ToolHandler for SaveNote {
    async fn call(&self, args: ToolArgs) -> Result<ToolOutcome, ToolError> {
        let (Ok(session_id), Ok(text)) = (args.require_text("session_id"), args.require_text("text"))
        else {
            return Ok(ToolOutcome::to_server(
                "A session id and the note text are required. Please retry.",
            ));
        };

        // The session id doubles as the note file name
        self.http
            .post(&self.config.append_url)
            .json(&json!({
                "baseUrl": self.config.base_url,
                "fileName": format!("{session_id}.txt"),
                "text": text,
            }))
            .send()
            .await?
            .error_for_status()?;

        Ok(ToolOutcome::to_server("Note saved successfully"))
    }
}

struct ModifyFile {
    http: reqwest::Client,
    config: NotepadConfig,
}

#[async_trait]
impl ToolHandler for ModifyFile {
    async fn call(&self, args: ToolArgs) -> Result<ToolOutcome, ToolError> {
        let Ok(file_name) = args.require_text("fileName") else {
            return Ok(ToolOutcome::to_server(
                "No file name provided. Please retry.",
            ));
        };
        let temperature = args.text("temperature").unwrap_or(None);
        let hours = args.text("hours").unwrap_or(None);

        let (old_text, new_text) =
            match replacement_patterns(temperature.as_deref(), hours.as_deref()) {
                Ok(pair) => pair,
                Err(correction) => return Ok(ToolOutcome::to_server(correction)),
            };

        self.http
            .post(&self.config.replace_url)
            .json(&json!({
                "filePath": format!("{}/{}", self.config.base_url, file_name),
                "oldText": old_text,
                "newText": new_text,
            }))
            .send()
            .await?
            .error_for_status()?;

        Ok(ToolOutcome::to_server("File modified successfully"))
    }
}

struct GetFileName {
    http: reqwest::Client,
    config: NotepadConfig,
}

#[async_trait]
impl ToolHandler for GetFileName {
    async fn call(&self, args: ToolArgs) -> Result<ToolOutcome, ToolError> {
        let Ok(text) = args.require_text("text") else {
            return Ok(ToolOutcome::to_server(
                "A keyword is required to find the file. Please retry.",
            ));
        };

        let response: Value = self
            .http
            .post(&self.config.lookup_url)
            .json(&json!({
                "baseUrl": self.config.base_url,
                "text": text.to_lowercase(),
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match response.get("fileName").and_then(Value::as_str) {
            Some(file_name) if !file_name.is_empty() => {
                Ok(ToolOutcome::to_server(file_name.to_string()))
            }
            _ => Ok(ToolOutcome::to_server("No file name found. Please retry")),
        }
    }
}

fn save_note_schema() -> Value {
    json!({
        "type": "function",
        "name": "notepad_save_note",
        "description": "Save the note provided by the user. The note must be a string. \
            Never ask the user about the session_id. Before running this tool, repeat \
            the collected text and ask the user to confirm the action, then proceed \
            with the execution.",
        "parameters": {
            "type": "object",
            "properties": {
                "session_id": {
                    "type": "string",
                    "description": "The session ID used to identify the file to be modified."
                },
                "text": {
                    "type": "string",
                    "description": "The actual text of the note to be saved"
                }
            },
            "required": ["session_id", "text"]
        }
    })
}

fn modify_file_schema() -> Value {
    json!({
        "type": "function",
        "name": "notepad_modify_file",
        "description": "Modify a text file by replacing all occurrences of temperature \
            and hours. Before running this tool, repeat the collected parameters and \
            ask the user to confirm the action, then proceed with the execution.",
        "parameters": {
            "type": "object",
            "properties": {
                "fileName": {
                    "type": "string",
                    "description": "The name of the text file to be modified."
                },
                "temperature": {
                    "type": "string",
                    "description": "The value of temperature to be replaced in the file"
                },
                "hours": {
                    "type": "string",
                    "description": "The number of hours to be replaced in the file"
                }
            },
            "required": ["fileName"]
        }
    })
}

fn get_file_name_schema() -> Value {
    json!({
        "type": "function",
        "name": "notepad_get_file_name",
        "description": "Get the file name using the text provided by the user. \
            If the user provided a number as keyword, be sure to use the digit \
            representation of the number, not the string. For example, if the user \
            provided 10, use 10, not ten.",
        "parameters": {
            "type": "object",
            "properties": {
                "text": {
                    "type": "string",
                    "description": "A keyword within the file name."
                }
            },
            "required": ["text"]
        }
    })
}

/// Register the notepad tools against the configured note backend.
pub fn attach(
    registry: &mut ToolRegistry,
    http: reqwest::Client,
    config: NotepadConfig,
) -> Result<(), RegistryError> {
    registry.register(ToolDescriptor::new(
        "notepad_save_note",
        save_note_schema(),
        Arc::new(SaveNote {
            http: http.clone(),
            config: config.clone(),
        }),
    ))?;
    registry.register(ToolDescriptor::new(
        "notepad_modify_file",
        modify_file_schema(),
        Arc::new(ModifyFile {
            http: http.clone(),
            config: config.clone(),
        }),
    ))?;
    registry.register(ToolDescriptor::new(
        "notepad_get_file_name",
        get_file_name_schema(),
        Arc::new(GetFileName { http, config }),
    ))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hours_only_pattern() {
        let (old, new) = replacement_patterns(None, Some("12")).unwrap();
        assert_eq!(old, "xh");
        assert_eq!(new, "12h");
    }

    #[test]
    fn test_temperature_only_pattern() {
        let (old, new) = replacement_patterns(Some("80.5"), None).unwrap();
        assert_eq!(old, "yC");
        assert_eq!(new, "80.5C");
    }

    #[test]
    fn test_combined_pattern() {
        let (old, new) = replacement_patterns(Some("80"), Some("12")).unwrap();
        assert_eq!(old, "xhyC");
        assert_eq!(new, "12h80C");
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(replacement_patterns(None, None).is_err());
        assert!(replacement_patterns(None, Some("twelve")).is_err());
        assert!(replacement_patterns(Some("warm"), None).is_err());
        assert!(replacement_patterns(Some("80"), Some("1.5")).is_err());
    }
}
