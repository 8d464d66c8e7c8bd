//! Events emitted by the agent loop.

use serde::{Deserialize, Serialize};

use crate::types::{AgentToolCall, AgentToolResult, RunMetrics};

/// One event in an agent run's output stream.
///
/// Consumers that only want the visible answer read the `Delta` text and
/// ignore every other shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Incremental assistant text.
    Delta { text: String },
    /// The model requested a tool.
    ToolCallStarted { call: AgentToolCall },
    /// A tool finished executing.
    ToolResult { result: AgentToolResult },
    /// Terminal event; carries the run's metrics.
    Completed { metrics: RunMetrics },
}
