//! Core Agent with streaming tool loop.

use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;
use tracing::{debug, warn};

use crate::error::{Result, SkiffError};
use crate::memory::MemorySessionManager;
use crate::model::{ModelRequest, ModelRuntime, ToolDefinition};
use crate::tools::{Tool, ToolArguments, ToolExecutionContext};
use crate::types::{
    AgentToolCall, AgentToolResult, ContentPart, ModelMessage, Role, RunMetrics, StreamEventType,
};

use super::events::AgentEvent;

/// Upper bound on model/tool round-trips in one run.
pub const MAX_TOOL_ITERATIONS: usize = 20;

/// Result of a fully-collected run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Concatenated assistant text (unfiltered).
    pub text: String,
    /// Metrics accumulated across the run.
    pub metrics: RunMetrics,
}

/// A tool-using agent bound to one invocation.
///
/// Owns its runtime handle, tools, and optional memory session; constructed
/// per request and consumed by [`Agent::stream`] or [`Agent::execute`].
pub struct Agent {
    runtime: Arc<dyn ModelRuntime>,
    system_prompt: Option<String>,
    tools: Vec<Arc<dyn Tool>>,
    memory: Option<MemorySessionManager>,
    session_id: Option<String>,
    max_iterations: usize,
}

impl Agent {
    /// Create a new agent.
    pub fn new(runtime: Arc<dyn ModelRuntime>) -> Self {
        Self {
            runtime,
            system_prompt: None,
            tools: Vec::new(),
            memory: None,
            session_id: None,
            max_iterations: MAX_TOOL_ITERATIONS,
        }
    }

    /// Set system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Add a tool.
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    /// Add several tools.
    pub fn with_tools(mut self, tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        self.tools.extend(tools);
        self
    }

    /// Attach a memory session.
    pub fn with_memory(mut self, memory: MemorySessionManager) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Tag tool executions with a session id.
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Run the agent, streaming events as they happen.
    ///
    /// The loop streams one model turn, executes any requested tools, and
    /// repeats until a turn ends without tool calls. Dropping the returned
    /// stream cancels the run.
    pub fn stream(self, prompt: impl Into<String>) -> BoxStream<'static, Result<AgentEvent>> {
        let prompt = prompt.into();
        let run_id = uuid::Uuid::new_v4();
        let stream = async_stream::stream! {
            debug!(run_id = %run_id, model = self.runtime.model_id(), "agent run start");
            let mut system = self.system_prompt.clone();
            if let Some(memory) = &self.memory {
                match memory.load_context(&prompt).await {
                    Ok(records) if !records.is_empty() => {
                        debug!(count = records.len(), "hydrating memory context");
                        let mut context = String::from("Relevant context from memory:");
                        for record in &records {
                            context.push_str("\n- ");
                            context.push_str(&record.content);
                        }
                        system = Some(match system {
                            Some(base) => format!("{base}\n\n{context}"),
                            None => context,
                        });
                    }
                    Ok(_) => {}
                    Err(err) => {
                        // Retrieval is best-effort; the run proceeds without it.
                        warn!(error = %err, "memory retrieval failed");
                    }
                }
            }

            let tool_defs: Vec<ToolDefinition> = self
                .tools
                .iter()
                .map(|tool| ToolDefinition {
                    name: tool.name().to_string(),
                    description: tool.description().to_string(),
                    parameters: tool.parameters().schema.clone(),
                })
                .collect();

            let mut messages = vec![ModelMessage::user(prompt.clone())];
            let mut metrics = RunMetrics::default();
            let mut run_text = String::new();
            let mut completed = false;

            for iteration in 1..=self.max_iterations {
                metrics.iterations = iteration;
                let request = ModelRequest {
                    system: system.clone(),
                    messages: messages.clone(),
                    tools: tool_defs.clone(),
                };

                let turn = match self.runtime.stream_turn(&request).await {
                    Ok(turn) => turn,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };

                let mut turn_text = String::new();
                let mut tool_calls: Vec<AgentToolCall> = Vec::new();
                let mut turn = std::pin::pin!(turn);
                while let Some(item) = turn.next().await {
                    match item {
                        Ok(delta) => match delta.event_type {
                            StreamEventType::TextDelta => {
                                if !delta.text.is_empty() {
                                    turn_text.push_str(&delta.text);
                                    yield Ok(AgentEvent::Delta { text: delta.text });
                                }
                            }
                            StreamEventType::ToolCallDelta => {
                                if let Some(call) = delta.tool_call {
                                    // Later deltas for the same call id replace
                                    // earlier partial ones.
                                    match tool_calls.iter().position(|c| c.id == call.id) {
                                        Some(idx) => tool_calls[idx] = call,
                                        None => tool_calls.push(call),
                                    }
                                }
                            }
                            StreamEventType::Done => {
                                if let Some(usage) = delta.usage {
                                    metrics.usage.add(usage);
                                }
                            }
                            _ => {}
                        },
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }

                run_text.push_str(&turn_text);

                if tool_calls.is_empty() {
                    completed = true;
                    break;
                }

                let mut assistant_content: Vec<ContentPart> = Vec::new();
                if !turn_text.is_empty() {
                    assistant_content.push(ContentPart::Text { text: turn_text });
                }
                for call in &tool_calls {
                    assistant_content.push(ContentPart::ToolCall(call.clone()));
                }
                messages.push(ModelMessage {
                    role: Role::Assistant,
                    content: assistant_content,
                    timestamp: Some(chrono::Utc::now()),
                });

                for call in tool_calls {
                    yield Ok(AgentEvent::ToolCallStarted { call: call.clone() });
                    let result = self.execute_tool(&call).await;
                    metrics.record_tool_call(&call, result.is_error);
                    yield Ok(AgentEvent::ToolResult { result: result.clone() });
                    messages.push(ModelMessage::tool_result(
                        result.tool_call_id,
                        result.result,
                        result.is_error,
                    ));
                }
            }

            if !completed {
                yield Err(SkiffError::Stream("tool loop exceeded max iterations".into()));
                return;
            }

            if let Some(memory) = &self.memory {
                if let Err(err) = memory.record_turn(&prompt, &run_text).await {
                    warn!(error = %err, "failed to record turn to memory");
                }
            }

            debug!(
                run_id = %run_id,
                iterations = metrics.iterations,
                tool_calls = metrics.tool_calls.len(),
                "agent run completed"
            );
            yield Ok(AgentEvent::Completed { metrics });
        };
        Box::pin(stream)
    }

    /// Run the agent to completion, collecting the streamed text.
    pub async fn execute(self, prompt: impl Into<String>) -> Result<RunOutcome> {
        let mut stream = self.stream(prompt);
        let mut text = String::new();
        let mut metrics = RunMetrics::default();
        while let Some(event) = stream.next().await {
            match event? {
                AgentEvent::Delta { text: delta } => text.push_str(&delta),
                AgentEvent::Completed { metrics: collected } => metrics = collected,
                _ => {}
            }
        }
        Ok(RunOutcome { text, metrics })
    }

    async fn execute_tool(&self, call: &AgentToolCall) -> AgentToolResult {
        let args = ToolArguments::new(call.arguments.clone());
        let ctx = ToolExecutionContext {
            session_id: self.session_id.clone(),
            tool_call_id: Some(call.id.clone()),
        };
        match self.tools.iter().find(|tool| tool.name() == call.name) {
            Some(tool) => {
                debug!(tool = call.name.as_str(), "executing tool");
                match tool.execute(&args, &ctx).await {
                    Ok(value) => AgentToolResult {
                        tool_call_id: call.id.clone(),
                        result: value,
                        is_error: false,
                    },
                    Err(e) => AgentToolResult {
                        tool_call_id: call.id.clone(),
                        result: serde_json::json!({ "error": e.to_string() }),
                        is_error: true,
                    },
                }
            }
            None => AgentToolResult {
                tool_call_id: call.id.clone(),
                result: serde_json::json!({
                    "error": format!("Tool '{}' not found", call.name)
                }),
                is_error: true,
            },
        }
    }
}
