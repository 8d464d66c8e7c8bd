//! Shared test support: a model runtime that replays scripted turns.

use std::collections::VecDeque;

use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio::sync::Mutex;

use skiff::error::{Result, SkiffError};
use skiff::model::{ModelRequest, ModelRuntime};
use skiff::types::{AgentToolCall, FinishReason, TextStreamDelta};

/// Runtime that replays scripted turns and records the requests it saw.
pub struct ScriptedRuntime {
    turns: Mutex<VecDeque<Vec<TextStreamDelta>>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedRuntime {
    pub fn new(turns: Vec<Vec<TextStreamDelta>>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub async fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl ModelRuntime for ScriptedRuntime {
    fn model_id(&self) -> &str {
        "scripted"
    }

    async fn stream_turn(
        &self,
        request: &ModelRequest,
    ) -> Result<BoxStream<'static, Result<TextStreamDelta>>> {
        self.requests.lock().await.push(request.clone());
        let turn = self
            .turns
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| SkiffError::Stream("no scripted turns left".into()))?;
        Ok(Box::pin(futures::stream::iter(turn.into_iter().map(Ok))))
    }
}

/// A turn that requests `add_numbers` after a little preamble.
pub fn tool_call_turn() -> Vec<TextStreamDelta> {
    vec![
        TextStreamDelta::text("Let me compute. "),
        TextStreamDelta::tool_call(AgentToolCall {
            id: "call-1".into(),
            name: "add_numbers".into(),
            arguments: serde_json::json!({"a": 40, "b": 2}),
        }),
        TextStreamDelta::done(FinishReason::ToolUse, None),
    ]
}

/// A terminal turn with plain text.
pub fn final_turn(text: &str) -> Vec<TextStreamDelta> {
    vec![
        TextStreamDelta::text(text),
        TextStreamDelta::done(FinishReason::Stop, None),
    ]
}
