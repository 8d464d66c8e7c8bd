//! Model runtime client.
//!
//! [`ModelRuntime`] is the seam between the agent loop and the hosted
//! inference service; [`HostedModelRuntime`] is the production
//! implementation, speaking JSON-over-SSE to a managed endpoint.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::Serialize;
use tracing::debug;

use crate::error::{Result, SkiffError};
use crate::http::{parse_sse_data, shared_client, status_to_error};
use crate::types::{AgentToolCall, FinishReason, ModelMessage, TextStreamDelta, Usage};

/// Default hosted model.
pub const DEFAULT_MODEL_ID: &str = "hosted.micro-v1";

/// A tool surface advertised to the model.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// One turn's worth of input to the model.
#[derive(Debug, Clone, Serialize)]
pub struct ModelRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<ModelMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

/// Streaming interface to a model.
#[async_trait]
pub trait ModelRuntime: Send + Sync {
    /// Identifier of the model this runtime targets.
    fn model_id(&self) -> &str;

    /// Stream one model turn as deltas.
    async fn stream_turn(
        &self,
        request: &ModelRequest,
    ) -> Result<BoxStream<'static, Result<TextStreamDelta>>>;
}

/// Client for a managed inference endpoint.
pub struct HostedModelRuntime {
    base_url: String,
    model_id: String,
}

impl HostedModelRuntime {
    /// Create a runtime client with the default model.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model_id: DEFAULT_MODEL_ID.to_string(),
        }
    }

    /// Override the model id.
    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }
}

#[async_trait]
impl ModelRuntime for HostedModelRuntime {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn stream_turn(
        &self,
        request: &ModelRequest,
    ) -> Result<BoxStream<'static, Result<TextStreamDelta>>> {
        let url = format!(
            "{}/model/{}/invoke-stream",
            self.base_url.trim_end_matches('/'),
            self.model_id
        );

        debug!(model = self.model_id.as_str(), "model stream_turn");

        let resp = shared_client().post(&url).json(request).send().await?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body_text));
        }

        let byte_stream = resp.bytes_stream();

        let stream = async_stream::stream! {
            let mut buffer = String::new();
            futures::pin_mut!(byte_stream);

            while let Some(chunk_result) = byte_stream.next().await {
                let chunk = match chunk_result {
                    Ok(c) => c,
                    Err(e) => {
                        yield Err(SkiffError::Network(e));
                        break;
                    }
                };

                buffer.push_str(&String::from_utf8_lossy(&chunk));

                while let Some(line_end) = buffer.find('\n') {
                    let line = buffer[..line_end].trim().to_string();
                    buffer = buffer[line_end + 1..].to_string();

                    if line.is_empty() || line.starts_with(':') {
                        continue;
                    }

                    if let Some(data) = parse_sse_data(&line) {
                        match serde_json::from_str::<serde_json::Value>(data) {
                            Ok(event) => {
                                if let Some(delta) = map_runtime_event(&event) {
                                    yield Ok(delta);
                                }
                            }
                            Err(e) => {
                                yield Err(SkiffError::Stream(format!(
                                    "malformed runtime event: {e}"
                                )));
                            }
                        }
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

/// Map one runtime SSE event into a delta.
///
/// Unknown event shapes are skipped rather than failing the stream.
fn map_runtime_event(event: &serde_json::Value) -> Option<TextStreamDelta> {
    let event_type = event.get("type").and_then(|t| t.as_str())?;
    match event_type {
        "text_delta" => {
            let text = event.get("text").and_then(|t| t.as_str())?;
            Some(TextStreamDelta::text(text))
        }
        "tool_use" => {
            let call = AgentToolCall {
                id: event.get("id").and_then(|v| v.as_str())?.to_string(),
                name: event.get("name").and_then(|v| v.as_str())?.to_string(),
                arguments: event
                    .get("input")
                    .cloned()
                    .unwrap_or(serde_json::Value::Null),
            };
            Some(TextStreamDelta::tool_call(call))
        }
        "message_stop" => {
            let finish_reason = match event.get("stop_reason").and_then(|v| v.as_str()) {
                Some("tool_use") => FinishReason::ToolUse,
                Some("max_tokens") => FinishReason::Length,
                _ => FinishReason::Stop,
            };
            let usage = event.get("usage").map(|u| Usage {
                input_tokens: u.get("input_tokens").and_then(|v| v.as_u64()).unwrap_or(0),
                output_tokens: u.get("output_tokens").and_then(|v| v.as_u64()).unwrap_or(0),
            });
            Some(TextStreamDelta::done(finish_reason, usage))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StreamEventType;
    use serde_json::json;

    #[test]
    fn maps_text_delta_events() {
        let delta = map_runtime_event(&json!({"type": "text_delta", "text": "hi"})).unwrap();
        assert_eq!(delta.event_type, StreamEventType::TextDelta);
        assert_eq!(delta.text, "hi");
    }

    #[test]
    fn maps_tool_use_events() {
        let delta = map_runtime_event(&json!({
            "type": "tool_use",
            "id": "call-1",
            "name": "add_numbers",
            "input": {"a": 1, "b": 2},
        }))
        .unwrap();
        assert_eq!(delta.event_type, StreamEventType::ToolCallDelta);
        let call = delta.tool_call.unwrap();
        assert_eq!(call.name, "add_numbers");
        assert_eq!(call.arguments["a"], 1);
    }

    #[test]
    fn maps_message_stop_with_usage() {
        let delta = map_runtime_event(&json!({
            "type": "message_stop",
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 12, "output_tokens": 34},
        }))
        .unwrap();
        assert_eq!(delta.event_type, StreamEventType::Done);
        assert_eq!(delta.finish_reason, Some(FinishReason::ToolUse));
        assert_eq!(delta.usage.unwrap().output_tokens, 34);
    }

    #[test]
    fn skips_unknown_event_shapes() {
        assert!(map_runtime_event(&json!({"type": "ping"})).is_none());
        assert!(map_runtime_event(&json!({"no_type": true})).is_none());
        // Missing payload fields degrade to a skip, not a panic.
        assert!(map_runtime_event(&json!({"type": "text_delta"})).is_none());
    }
}
