//! Junior machine agent: equipment status and setpoint control.
//!
//! The machine state is simulated; a production deployment would talk to the
//! instrument's own control API instead. The state object is constructed in
//! `main`, wrapped in a lock and injected at registration time, so concurrent
//! sessions share one machine without hidden globals.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::core::tools::{
    ToolArgs, ToolDescriptor, ToolError, ToolHandler, ToolOutcome, ToolRegistry, format_number,
};
use crate::core::RegistryError;

/// Temperature info for a single location on a deck.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionReading {
    /// Human-readable position identifier
    pub name: String,
    /// Target temperature in degrees Celsius
    pub setpoint: f64,
    /// Measured temperature in degrees Celsius
    pub temperature: f64,
}

/// A deck and the readings for its positions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deck {
    /// Human-readable deck identifier
    pub name: String,
    pub positions: Vec<PositionReading>,
}

/// State of the Junior machine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MachineState {
    pub decks: Vec<Deck>,
}

impl MachineState {
    /// The simulated bench setup the assistant starts with.
    pub fn simulated() -> Self {
        Self {
            decks: vec![
                Deck {
                    name: "1".into(),
                    positions: vec![
                        PositionReading {
                            name: "1".into(),
                            setpoint: 0.0,
                            temperature: 27.2,
                        },
                        PositionReading {
                            name: "2".into(),
                            setpoint: 0.1,
                            temperature: 27.3,
                        },
                    ],
                },
                Deck {
                    name: "2".into(),
                    positions: vec![
                        PositionReading {
                            name: "1".into(),
                            setpoint: 0.0,
                            temperature: 27.1,
                        },
                        PositionReading {
                            name: "2".into(),
                            setpoint: 100.0,
                            temperature: 100.0,
                        },
                    ],
                },
            ],
        }
    }

    fn position(&self, deck: &str, position: &str) -> Option<&PositionReading> {
        self.decks
            .iter()
            .find(|d| d.name == deck)?
            .positions
            .iter()
            .find(|p| p.name == position)
    }

    fn position_mut(&mut self, deck: &str, position: &str) -> Option<&mut PositionReading> {
        self.decks
            .iter_mut()
            .find(|d| d.name == deck)?
            .positions
            .iter_mut()
            .find(|p| p.name == position)
    }
}

/// Shared, lock-guarded machine state injected into the handlers.
pub type SharedMachineState = Arc<RwLock<MachineState>>;

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

/// Resolve and validate the deck/position pair every machine tool needs.
/// Errors are corrective sentences for the model, not failures.
fn deck_position(args: &ToolArgs) -> Result<(String, String), String> {
    let (Ok(Some(deck)), Ok(Some(position))) = (args.text("deck"), args.text("position")) else {
        return Err("No deck or position provided. Please retry.".into());
    };
    if !is_digits(&deck) || !is_digits(&position) {
        return Err(
            "Deck and position names must be numeric. Please retry with valid numbers.".into(),
        );
    }
    Ok((deck, position))
}

struct GetStatus {
    machine: SharedMachineState,
}

#[async_trait]
impl ToolHandler for GetStatus {
    async fn call(&self, args: ToolArgs) -> Result<ToolOutcome, ToolError> {
        let (deck, position) = match deck_position(&args) {
            Ok(pair) => pair,
            Err(correction) => return Ok(ToolOutcome::to_server(correction)),
        };

        let machine = self.machine.read();
        if !machine.decks.iter().any(|d| d.name == deck) {
            return Ok(ToolOutcome::to_server(format!("Deck {deck} not found.")));
        }
        let Some(reading) = machine.position(&deck, &position) else {
            return Ok(ToolOutcome::to_server(format!(
                "Position {position} not found on deck {deck}."
            )));
        };

        Ok(ToolOutcome::to_server(format!(
            "Position {position} on deck {deck}: Setpoint is {} \u{b0}C and current temperature is {} \u{b0}C.",
            format_number(reading.setpoint),
            format_number(reading.temperature),
        )))
    }
}

struct SetValues {
    machine: SharedMachineState,
}

#[async_trait]
impl ToolHandler for SetValues {
    async fn call(&self, args: ToolArgs) -> Result<ToolOutcome, ToolError> {
        let (deck, position) = match deck_position(&args) {
            Ok(pair) => pair,
            Err(correction) => return Ok(ToolOutcome::to_server(correction)),
        };

        if !args.contains("setpoint") {
            return Ok(ToolOutcome::to_server("No setpoint provided to update."));
        }
        let setpoint = match args.require_number("setpoint") {
            Ok(v) => v,
            Err(_) => {
                return Ok(ToolOutcome::to_server(
                    "Invalid setpoint value; must be a number.",
                ));
            }
        };

        let mut machine = self.machine.write();
        if !machine.decks.iter().any(|d| d.name == deck) {
            return Ok(ToolOutcome::to_server(format!("Deck {deck} not found.")));
        }
        let Some(reading) = machine.position_mut(&deck, &position) else {
            return Ok(ToolOutcome::to_server(format!(
                "Position {position} not found on deck {deck}."
            )));
        };
        reading.setpoint = setpoint;

        Ok(ToolOutcome::to_server(format!(
            "Updated position {position} on deck {deck}: new setpoint is {} \u{b0}C.",
            format_number(setpoint),
        )))
    }
}

fn get_status_schema() -> serde_json::Value {
    json!({
        "type": "function",
        "name": "machine_get_status",
        "description": "Check the status of the machine. \
            Deck and position names identify the machine's state. Both are numbers. \
            Be sure to use the digit representation of the number, not the string. \
            For example, if the user provided 10, use 10, not ten. \
            The machine can have multiple decks, each with multiple positions.",
        "parameters": {
            "type": "object",
            "properties": {
                "deck": {
                    "type": "string",
                    "description": "The name of the deck."
                },
                "position": {
                    "type": "string",
                    "description": "The name of the position on the deck."
                }
            },
            "required": ["deck", "position"]
        }
    })
}

fn set_values_schema() -> serde_json::Value {
    json!({
        "type": "function",
        "name": "machine_set_values",
        "description": "Set the values of the machine. \
            Deck and position names identify the machine's state. Both are numbers. \
            Be sure to use the digit representation of the number, not the string. \
            For example, if the user provided 10, use 10, not ten. \
            The machine can have multiple decks, each with multiple positions. \
            Each position has a setpoint and a temperature reading. \
            Before running this tool, repeat the collected setpoint parameter and ask \
            the user to confirm the action, then proceed with the execution.",
        "parameters": {
            "type": "object",
            "properties": {
                "deck": {
                    "type": "string",
                    "description": "The name of the deck."
                },
                "position": {
                    "type": "string",
                    "description": "The name of the position on the deck."
                },
                "setpoint": {
                    "type": "string",
                    "description": "The target temperature the machine will try to maintain at the position."
                }
            },
            "required": ["deck", "position", "setpoint"]
        }
    })
}

/// Register the machine tools against an injected machine state.
pub fn attach(registry: &mut ToolRegistry, machine: SharedMachineState) -> Result<(), RegistryError> {
    registry.register(ToolDescriptor::new(
        "machine_get_status",
        get_status_schema(),
        Arc::new(GetStatus {
            machine: machine.clone(),
        }),
    ))?;
    registry.register(ToolDescriptor::new(
        "machine_set_values",
        set_values_schema(),
        Arc::new(SetValues { machine }),
    ))?;
    Ok(())
}
