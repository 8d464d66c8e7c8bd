//! Streaming types.

use serde::{Deserialize, Serialize};

use super::message::AgentToolCall;
use super::metrics::Usage;

/// A delta emitted while streaming one model turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextStreamDelta {
    /// The incremental text chunk.
    pub text: String,
    /// Event type.
    pub event_type: StreamEventType,
    /// Tool call carried by a tool-call delta.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<AgentToolCall>,
    /// Finish reason (only on the final delta).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
    /// Usage (typically only on the final delta).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl TextStreamDelta {
    /// A plain text delta.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            event_type: StreamEventType::TextDelta,
            tool_call: None,
            finish_reason: None,
            usage: None,
        }
    }

    /// A tool-call delta.
    pub fn tool_call(call: AgentToolCall) -> Self {
        Self {
            text: String::new(),
            event_type: StreamEventType::ToolCallDelta,
            tool_call: Some(call),
            finish_reason: None,
            usage: None,
        }
    }

    /// The terminal delta of a turn.
    pub fn done(finish_reason: FinishReason, usage: Option<Usage>) -> Self {
        Self {
            text: String::new(),
            event_type: StreamEventType::Done,
            tool_call: None,
            finish_reason: Some(finish_reason),
            usage,
        }
    }
}

/// Type of stream event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StreamEventType {
    /// Incremental text content.
    TextDelta,
    /// Tool call being built.
    ToolCallDelta,
    /// Stream started.
    Start,
    /// Stream finished.
    Done,
    /// Error during stream.
    Error,
}

/// Why a model turn stopped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    ToolUse,
    Length,
    Error,
}
