//! Built-in local tools.

use std::sync::Arc;

use crate::tools::tool::{AgentTool, Tool, ToolExecutionContext};
use crate::tools::types::AgentToolParameters;

/// Create the `add_numbers` tool — returns the sum of two numbers.
pub fn add_numbers_tool() -> Arc<dyn Tool> {
    Arc::new(AgentTool::new(
        "add_numbers",
        "Return the sum of two numbers",
        AgentToolParameters::object()
            .number("a", "First addend", true)
            .number("b", "Second addend", true)
            .build(),
        |args, _ctx: ToolExecutionContext| async move {
            let a = args.get_f64("a")?;
            let b = args.get_f64("b")?;
            Ok(serde_json::json!({ "sum": a + b }))
        },
    ))
}
