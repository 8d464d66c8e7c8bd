//! Service-level tests: the invocation endpoint end to end.

mod common;

use std::future::IntoFuture;
use std::sync::Arc;

use common::{final_turn, ScriptedRuntime};
use skiff::config::RuntimeConfig;
use skiff::service::{router, AppState};
use skiff::types::{FinishReason, TextStreamDelta};

fn test_config() -> RuntimeConfig {
    RuntimeConfig {
        listen_addr: "127.0.0.1:0".into(),
        model_runtime_url: "http://unused.invalid".into(),
        model_id: None,
        sandbox_url: "http://unused.invalid".into(),
        memory_id: None,
        memory_url: None,
        mcp_server_url: None,
    }
}

async fn spawn_service(runtime: Arc<ScriptedRuntime>) -> String {
    let state = AppState {
        config: test_config(),
        runtime,
        memory_store: None,
        remote_tools: Vec::new(),
    };
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(axum::serve(listener, router(state)).into_future());
    format!("http://{addr}")
}

#[tokio::test]
async fn ping_responds() {
    let base = spawn_service(Arc::new(ScriptedRuntime::new(vec![]))).await;
    let body = reqwest::get(format!("{base}/ping"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn invocation_streams_the_visible_answer() {
    let runtime = Arc::new(ScriptedRuntime::new(vec![final_turn("hello caller")]));
    let base = spawn_service(runtime).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/invocations"))
        .json(&serde_json::json!({"prompt": "hi"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "hello caller");
}

#[tokio::test]
async fn invocation_filters_thinking_spans() {
    let runtime = Arc::new(ScriptedRuntime::new(vec![vec![
        TextStreamDelta::text("<thinking>internal "),
        TextStreamDelta::text("plan</thinking>"),
        TextStreamDelta::text("only this is visible"),
        TextStreamDelta::done(FinishReason::Stop, None),
    ]]));
    let base = spawn_service(runtime).await;

    let body = reqwest::Client::new()
        .post(format!("{base}/invocations"))
        .json(&serde_json::json!({"prompt": "hi", "user_id": "u-1"}))
        .header("x-session-id", "sess-42")
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert_eq!(body, "only this is visible");
}

#[tokio::test]
async fn unterminated_thinking_span_yields_empty_body() {
    let runtime = Arc::new(ScriptedRuntime::new(vec![vec![
        TextStreamDelta::text("<thinking>never closes"),
        TextStreamDelta::done(FinishReason::Stop, None),
    ]]));
    let base = spawn_service(runtime).await;

    let body = reqwest::Client::new()
        .post(format!("{base}/invocations"))
        .json(&serde_json::json!({"prompt": "hi"}))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert_eq!(body, "");
}
