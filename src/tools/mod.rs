//! Tool system: trait, typed arguments, schemas, and built-ins.

pub mod arguments;
pub mod builtin;
pub mod tool;
pub mod types;

pub use arguments::ToolArguments;
pub use builtin::add_numbers_tool;
pub use tool::{AgentTool, Tool, ToolExecutionContext};
pub use types::AgentToolParameters;
