//! Per-run usage and tool-call metrics.

use serde::{Deserialize, Serialize};

use super::message::AgentToolCall;

/// Token usage for a run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl Usage {
    pub fn add(&mut self, other: Usage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }

    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// One executed tool call, as observed by the agent loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub name: String,
    pub arguments: serde_json::Value,
    pub is_error: bool,
}

/// Metrics accumulated across one agent run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunMetrics {
    pub usage: Usage,
    pub iterations: usize,
    pub tool_calls: Vec<ToolCallRecord>,
}

impl RunMetrics {
    /// Record an executed tool call.
    pub fn record_tool_call(&mut self, call: &AgentToolCall, is_error: bool) {
        self.tool_calls.push(ToolCallRecord {
            name: call.name.clone(),
            arguments: call.arguments.clone(),
            is_error,
        });
    }

    /// The first recorded call of the named tool, if it ran.
    pub fn tool_call(&self, name: &str) -> Option<&ToolCallRecord> {
        self.tool_calls.iter().find(|record| record.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn usage_accumulates_across_turns() {
        let mut usage = Usage {
            input_tokens: 10,
            output_tokens: 5,
        };
        usage.add(Usage {
            input_tokens: 7,
            output_tokens: 3,
        });
        assert_eq!(usage.input_tokens, 17);
        assert_eq!(usage.output_tokens, 8);
        assert_eq!(usage.total_tokens(), 25);
    }

    #[test]
    fn tool_call_lookup_is_by_name() {
        let mut metrics = RunMetrics::default();
        metrics.record_tool_call(
            &AgentToolCall {
                id: "call-1".into(),
                name: "code_interpreter".into(),
                arguments: json!({"code": "print(1)"}),
            },
            false,
        );

        assert!(metrics.tool_call("code_interpreter").is_some());
        assert!(metrics.tool_call("add_numbers").is_none());
    }
}
