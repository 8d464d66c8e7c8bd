//! End-to-end agent loop tests against a scripted model runtime.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;

use common::{final_turn, tool_call_turn, ScriptedRuntime};
use skiff::agent::{Agent, AgentEvent};
use skiff::error::{Result, SkiffError};
use skiff::filter::ThinkingTagTransform;
use skiff::memory::{InMemoryMemoryStore, MemoryConfig, MemorySessionManager};
use skiff::model::{ModelRequest, ModelRuntime};
use skiff::tools::add_numbers_tool;
use skiff::types::{AgentToolCall, FinishReason, TextStreamDelta};

#[tokio::test]
async fn run_without_tools_streams_text_and_completes() {
    let runtime = Arc::new(ScriptedRuntime::new(vec![final_turn("plain answer")]));
    let agent = Agent::new(runtime.clone());

    let outcome = agent.execute("hi").await.unwrap();
    assert_eq!(outcome.text, "plain answer");
    assert_eq!(outcome.metrics.iterations, 1);
    assert!(outcome.metrics.tool_calls.is_empty());
}

#[tokio::test]
async fn tool_call_round_trip_feeds_result_back() {
    let runtime = Arc::new(ScriptedRuntime::new(vec![
        tool_call_turn(),
        final_turn("The sum is 42."),
    ]));
    let agent = Agent::new(runtime.clone()).with_tool(add_numbers_tool());

    let outcome = agent.execute("what is 40 + 2?").await.unwrap();

    assert_eq!(outcome.text, "Let me compute. The sum is 42.");
    assert_eq!(outcome.metrics.iterations, 2);
    assert_eq!(outcome.metrics.tool_calls.len(), 1);
    let record = outcome.metrics.tool_call("add_numbers").unwrap();
    assert!(!record.is_error);

    // The second request must carry the assistant tool call and its result.
    let requests = runtime.requests().await;
    assert_eq!(requests.len(), 2);
    let followup = &requests[1];
    assert_eq!(followup.messages.len(), 3);
    let results: Vec<_> = followup.messages[2]
        .content
        .iter()
        .filter_map(|part| match part {
            skiff::types::ContentPart::ToolResult(result) => Some(result),
            _ => None,
        })
        .collect();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].result["sum"], 42.0);
}

#[tokio::test]
async fn unknown_tool_yields_error_result_not_failure() {
    let runtime = Arc::new(ScriptedRuntime::new(vec![
        vec![
            TextStreamDelta::tool_call(AgentToolCall {
                id: "call-1".into(),
                name: "no_such_tool".into(),
                arguments: serde_json::json!({}),
            }),
            TextStreamDelta::done(FinishReason::ToolUse, None),
        ],
        final_turn("recovered"),
    ]));
    let agent = Agent::new(runtime);

    let outcome = agent.execute("hi").await.unwrap();
    assert_eq!(outcome.text, "recovered");
    let record = outcome.metrics.tool_call("no_such_tool").unwrap();
    assert!(record.is_error);
}

#[tokio::test]
async fn memory_records_the_completed_turn() {
    let store = Arc::new(InMemoryMemoryStore::new());
    store
        .insert("facts/user-1", "prefers short answers", 0.9)
        .await;

    let runtime = Arc::new(ScriptedRuntime::new(vec![final_turn("done")]));
    let manager = MemorySessionManager::new(
        store.clone(),
        MemoryConfig::for_actor("mem-1", "sess-1", "user-1"),
    );
    let agent = Agent::new(runtime.clone()).with_memory(manager);

    let outcome = agent.execute("question").await.unwrap();
    assert_eq!(outcome.text, "done");

    // Hydrated context lands in the system prompt.
    let requests = runtime.requests().await;
    let system = requests[0].system.as_deref().unwrap_or_default();
    assert!(system.contains("prefers short answers"));

    let events = store.events().await;
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0],
        ("sess-1".into(), "question".into(), "done".into())
    );
}

#[tokio::test]
async fn filtered_run_hides_thinking_from_the_visible_answer() {
    let runtime = Arc::new(ScriptedRuntime::new(vec![vec![
        TextStreamDelta::text("<thinking>the user wants"),
        TextStreamDelta::text(" a sum</thinking>"),
        TextStreamDelta::text("It is 42."),
        TextStreamDelta::done(FinishReason::Stop, None),
    ]]));
    let agent = Agent::new(runtime);

    let events = agent.stream("question");
    let mut filtered = ThinkingTagTransform::new().transform(events);

    let mut visible = String::new();
    let mut saw_completed = false;
    while let Some(event) = filtered.next().await {
        match event.unwrap() {
            AgentEvent::Delta { text } => visible.push_str(&text),
            AgentEvent::Completed { .. } => saw_completed = true,
            _ => {}
        }
    }

    assert_eq!(visible, "It is 42.");
    assert!(saw_completed);
}

#[tokio::test]
async fn runtime_error_mid_stream_is_surfaced() {
    struct FailingRuntime;

    #[async_trait]
    impl ModelRuntime for FailingRuntime {
        fn model_id(&self) -> &str {
            "failing"
        }

        async fn stream_turn(
            &self,
            _request: &ModelRequest,
        ) -> Result<BoxStream<'static, Result<TextStreamDelta>>> {
            Ok(Box::pin(futures::stream::iter(vec![
                Ok(TextStreamDelta::text("partial")),
                Err(SkiffError::Stream("connection reset".into())),
            ])))
        }
    }

    let agent = Agent::new(Arc::new(FailingRuntime));
    let err = agent.execute("hi").await.expect_err("error should surface");
    assert!(matches!(err, SkiffError::Stream(_)));
}
