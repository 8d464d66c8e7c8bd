//! Convenience re-exports for common use.

pub use crate::agent::{Agent, AgentEvent, RunOutcome};
pub use crate::config::RuntimeConfig;
pub use crate::error::{Result, SkiffError};
pub use crate::filter::{ThinkingFilter, ThinkingTagTransform};
pub use crate::memory::{MemoryConfig, MemorySessionManager, MemoryStore};
pub use crate::model::{ModelRequest, ModelRuntime, ToolDefinition};
pub use crate::tools::{AgentTool, AgentToolParameters, Tool, ToolArguments};
pub use crate::types::{
    AgentToolCall, AgentToolResult, InvocationRequest, ModelMessage, RequestContext, Role,
    RunMetrics, StreamEventType, TextStreamDelta, Usage,
};
