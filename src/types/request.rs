//! Invocation request payload and per-request context.

use serde::{Deserialize, Serialize};

pub const DEFAULT_SESSION_ID: &str = "default";
pub const DEFAULT_USER_ID: &str = "default-user";

/// Body of an invocation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationRequest {
    /// Free-text prompt for the agent.
    pub prompt: String,
    /// Optional caller identity; falls back to [`DEFAULT_USER_ID`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl InvocationRequest {
    pub fn user_id(&self) -> &str {
        self.user_id.as_deref().unwrap_or(DEFAULT_USER_ID)
    }
}

/// Transport-level context accompanying a request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub session_id: Option<String>,
}

impl RequestContext {
    pub fn session_id(&self) -> &str {
        self.session_id.as_deref().unwrap_or(DEFAULT_SESSION_ID)
    }
}
