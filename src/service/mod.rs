//! HTTP surface: the invocation endpoint and its wiring.

pub mod format;

pub use format::format_response;

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::StreamExt;
use tracing::info;

use crate::agent::{Agent, AgentEvent};
use crate::config::RuntimeConfig;
use crate::filter::ThinkingTagTransform;
use crate::memory::{MemoryConfig, MemorySessionManager, MemoryStore};
use crate::model::ModelRuntime;
use crate::sandbox::{CodeInterpreter, SandboxConfig};
use crate::tools::{add_numbers_tool, Tool};
use crate::types::{InvocationRequest, RequestContext};

/// System prompt for every invocation.
const SYSTEM_PROMPT: &str = "You are a helpful assistant. Use tools when appropriate. \
IMPORTANT: Do not show your thinking process to the user.";

const SESSION_ID_HEADER: &str = "x-session-id";

/// Shared service state, built once at startup.
///
/// The MCP tool set is discovered during startup and reused by every
/// request; per-request collaborators (memory session, sandbox session)
/// are constructed in the handler.
#[derive(Clone)]
pub struct AppState {
    pub config: RuntimeConfig,
    pub runtime: Arc<dyn ModelRuntime>,
    pub memory_store: Option<Arc<dyn MemoryStore>>,
    pub remote_tools: Vec<Arc<dyn Tool>>,
}

/// Build the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/invocations", post(invoke))
        .with_state(state)
}

async fn ping() -> &'static str {
    "ok"
}

/// Handle one invocation: run the agent and stream the filtered answer.
async fn invoke(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<InvocationRequest>,
) -> Response {
    let context = RequestContext {
        session_id: headers
            .get(SESSION_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
    };
    let session_id = context.session_id().to_string();
    let user_id = request.user_id().to_string();

    info!(
        session_id = session_id.as_str(),
        user_id = user_id.as_str(),
        "invocation started"
    );

    let mut agent = Agent::new(state.runtime.clone())
        .with_system_prompt(SYSTEM_PROMPT)
        .with_session_id(session_id.as_str())
        .with_tool(Arc::new(CodeInterpreter::new(SandboxConfig::new(
            state.config.sandbox_url.as_str(),
            session_id.as_str(),
        ))))
        .with_tool(add_numbers_tool())
        .with_tools(state.remote_tools.iter().cloned());

    if let (Some(memory_id), Some(store)) = (&state.config.memory_id, &state.memory_store) {
        let memory_config =
            MemoryConfig::for_actor(memory_id.as_str(), session_id.as_str(), user_id.as_str());
        agent = agent.with_memory(MemorySessionManager::new(store.clone(), memory_config));
    }

    let events = agent.stream(request.prompt);
    let filtered = ThinkingTagTransform::new().transform(events);

    let body_stream = filtered.filter_map(|event| async move {
        match event {
            Ok(AgentEvent::Delta { text }) => Some(Ok(axum::body::Bytes::from(text))),
            Ok(_) => None,
            Err(err) => Some(Err(err)),
        }
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Body::from_stream(body_stream))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
