//! Calculator agent: basic arithmetic the assistant performs on request.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::core::RegistryError;
use crate::core::tools::{
    ToolArgs, ToolDescriptor, ToolError, ToolHandler, ToolOutcome, ToolRegistry,
};

#[derive(Debug, Clone, Copy)]
enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

struct Arithmetic {
    op: Operation,
}

#[async_trait]
impl ToolHandler for Arithmetic {
    async fn call(&self, args: ToolArgs) -> Result<ToolOutcome, ToolError> {
        let (a, b) = match (args.require_number("A"), args.require_number("B")) {
            (Ok(a), Ok(b)) => (a, b),
            _ => {
                return Ok(ToolOutcome::to_server(
                    "Both A and B must be numbers. Please retry.",
                ));
            }
        };

        let result = match self.op {
            Operation::Add => a + b,
            Operation::Subtract => a - b,
            Operation::Multiply => a * b,
            Operation::Divide => {
                if b == 0.0 {
                    return Ok(ToolOutcome::to_server("Division by zero error"));
                }
                a / b
            }
        };
        Ok(ToolOutcome::number(result))
    }
}

fn schema(name: &str, description: &str, a: &str, b: &str) -> Value {
    json!({
        "type": "function",
        "name": name,
        "description": description,
        "parameters": {
            "type": "object",
            "properties": {
                "A": { "type": "number", "description": a },
                "B": { "type": "number", "description": b }
            },
            "required": ["A", "B"],
            "additionalProperties": false
        }
    })
}

/// Register the four arithmetic tools.
pub fn attach(registry: &mut ToolRegistry) -> Result<(), RegistryError> {
    registry.register(ToolDescriptor::new(
        "calculator_add",
        schema(
            "calculator_add",
            "Add two numbers and provide the result",
            "The first number to add",
            "The second number to add",
        ),
        Arc::new(Arithmetic { op: Operation::Add }),
    ))?;
    registry.register(ToolDescriptor::new(
        "calculator_subtract",
        schema(
            "calculator_subtract",
            "Subtract two numbers and provide the result",
            "The first number to subtract from",
            "The second number to subtract",
        ),
        Arc::new(Arithmetic {
            op: Operation::Subtract,
        }),
    ))?;
    registry.register(ToolDescriptor::new(
        "calculator_multiply",
        schema(
            "calculator_multiply",
            "Multiply two numbers and provide the result",
            "The first number to multiply",
            "The second number to multiply",
        ),
        Arc::new(Arithmetic {
            op: Operation::Multiply,
        }),
    ))?;
    registry.register(ToolDescriptor::new(
        "calculator_divide",
        schema(
            "calculator_divide",
            "Divide two numbers and provide the result, with floating point precision",
            "The numerator",
            "The denominator",
        ),
        Arc::new(Arithmetic {
            op: Operation::Divide,
        }),
    ))?;
    Ok(())
}
