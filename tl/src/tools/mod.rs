//! Tool system for toolloop
//!
//! Tools are local capabilities the model may ask the orchestrator to run.
//! The `ToolRegistry` is built once and never changes during a run; the
//! `ToolDispatcher` turns every request into a `ToolOutcome`, whatever the
//! handler does.

mod dispatcher;
mod error;
mod registry;
mod traits;

pub mod builtin;

pub use dispatcher::{DispatchMode, ToolDispatcher, parse_arguments};
pub use error::{RegistryError, ToolError};
pub use registry::{Resolution, ToolRegistry, ToolRegistryBuilder};
pub use traits::{Tool, ToolOutcome};
