//! To-do list agent: creates tasks in an external task service.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::core::RegistryError;
use crate::core::tools::{
    ToolArgs, ToolDescriptor, ToolError, ToolHandler, ToolOutcome, ToolRegistry,
};

/// Task title stamped on every entry the assistant creates.
const TASK_TITLE: &str = "Created by Glovebox Assistant";

/// Endpoint of the task backend.
#[derive(Debug, Clone)]
pub struct TodolistConfig {
    /// Endpoint creating one task in a session's task list
    pub create_task_url: String,
}

struct CreateTask {
    http: reqwest::Client,
    config: TodolistConfig,
}

#[async_trait]
impl ToolHandler for CreateTask {
    async fn call(&self, args: ToolArgs) -> Result<ToolOutcome, ToolError> {
        let (Ok(session_id), Ok(text)) = (args.require_text("session_id"), args.require_text("text"))
        else {
            return Ok(ToolOutcome::to_server(
                "A session id and the task text are required. Please retry.",
            ));
        };

        // The session id doubles as the task list name
        self.http
            .post(&self.config.create_task_url)
            .json(&json!({
                "taskList": session_id,
                "taskTitle": TASK_TITLE,
                "taskText": text,
            }))
            .send()
            .await?
            .error_for_status()?;

        Ok(ToolOutcome::to_server("Task created successfully"))
    }
}

fn create_task_schema() -> Value {
    json!({
        "type": "function",
        "name": "todolist_create_task",
        "description": "Create a task based on the user request. Never ask the user \
            about the session_id. Before running this tool, repeat the collected text \
            and ask the user to confirm the action, then proceed with the execution.",
        "parameters": {
            "type": "object",
            "properties": {
                "session_id": {
                    "type": "string",
                    "description": "The session ID used to identify the task list to be modified."
                },
                "text": {
                    "type": "string",
                    "description": "The actual text of the task to be created"
                }
            },
            "required": ["session_id", "text"]
        }
    })
}

/// Register the to-do list tool against the configured task backend.
pub fn attach(
    registry: &mut ToolRegistry,
    http: reqwest::Client,
    config: TodolistConfig,
) -> Result<(), RegistryError> {
    registry.register(ToolDescriptor::new(
        "todolist_create_task",
        create_task_schema(),
        Arc::new(CreateTask { http, config }),
    ))
}
