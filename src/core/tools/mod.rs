//! Tool registration and dispatch.
//!
//! Tools are named, schema-described operations the realtime model may call
//! mid-conversation. Agent modules build [`ToolDescriptor`]s at startup and
//! register them in a [`ToolRegistry`]; each relay session dispatches calls
//! through a [`ToolInvoker`] that guarantees exactly one directional
//! [`ToolOutcome`] per call, whatever fails underneath.

mod args;
mod invoker;
mod registry;

pub use args::{ArgError, ToolArgs};
pub use invoker::{ToolDirection, ToolError, ToolInvoker, ToolOutcome, format_number};
pub use registry::{RegistryError, ToolDescriptor, ToolHandler, ToolRegistry};
