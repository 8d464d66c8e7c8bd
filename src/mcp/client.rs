//! MCP client over the streamable-HTTP transport.

use rmcp::{
    model::{CallToolRequestParams, CallToolResult, ClientInfo, Content, JsonObject,
        ResourceContents},
    service::{ClientInitializeError, DynService, RoleClient, RunningService, ServiceError,
        ServiceExt},
    transport::StreamableHttpClientTransport,
};
use tracing::info;

use crate::error::SkiffError;

use super::schema::McpToolSchema;

type DynClientService = Box<dyn DynService<RoleClient>>;
pub type McpRunningService = RunningService<RoleClient, DynClientService>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum McpConnectionState {
    Disconnected,
    Connected,
    Initialized,
    Closed,
}

#[derive(Debug, Clone)]
pub struct McpToolCallResult {
    pub structured_content: Option<serde_json::Value>,
    pub text_content: Option<String>,
    pub content: Vec<serde_json::Value>,
}

impl McpToolCallResult {
    pub fn into_value_or_text(self) -> serde_json::Value {
        if let Some(structured) = self.structured_content {
            return structured;
        }
        if let Some(text) = self.text_content {
            return serde_json::Value::String(text);
        }
        serde_json::Value::Array(self.content)
    }
}

/// Client for a Model Context Protocol server.
pub struct McpClient {
    session: Option<McpRunningService>,
    state: McpConnectionState,
}

impl McpClient {
    /// Connect to a server over streamable HTTP and complete initialization.
    pub async fn connect(endpoint: &str) -> Result<Self, SkiffError> {
        let transport = StreamableHttpClientTransport::from_uri(endpoint.to_string());
        let client_info = ClientInfo::default();
        let result = client_info.into_dyn().serve(transport).await;
        let mut client = Self::from_running_service_result(result)?;
        client.initialize().await?;
        info!(endpoint, "mcp client connected");
        Ok(client)
    }

    /// Create a client from an already-running rmcp service.
    ///
    /// Initialization handshake is already handled by rmcp `serve(...)`.
    pub fn from_running_service(session: McpRunningService) -> Self {
        Self {
            session: Some(session),
            state: McpConnectionState::Connected,
        }
    }

    /// Convert an rmcp initialization result into an MCP client.
    pub fn from_running_service_result(
        result: Result<McpRunningService, ClientInitializeError>,
    ) -> Result<Self, SkiffError> {
        result
            .map(Self::from_running_service)
            .map_err(map_client_initialize_error)
    }

    pub fn connection_state(&self) -> McpConnectionState {
        self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.state == McpConnectionState::Initialized
    }

    /// Mark the session usable after the rmcp handshake.
    pub async fn initialize(&mut self) -> Result<(), SkiffError> {
        if self.state == McpConnectionState::Initialized {
            return Ok(());
        }

        let Some(session) = self.session.as_ref() else {
            return Err(SkiffError::Configuration("Missing MCP session".into()));
        };

        if session.is_closed() {
            self.state = McpConnectionState::Closed;
            return Err(SkiffError::Stream("MCP session is closed".into()));
        }

        self.state = McpConnectionState::Initialized;
        Ok(())
    }

    /// List available tools from the MCP server.
    pub async fn list_tools(&mut self) -> Result<Vec<McpToolSchema>, SkiffError> {
        self.ensure_initialized()?;
        let session = self.session_ref()?;

        let tools = match session.list_all_tools().await {
            Ok(tools) => tools,
            Err(ServiceError::UnexpectedResponse) => {
                let page = session
                    .list_tools(None)
                    .await
                    .map_err(|e| map_service_error("list_tools", e))?;
                page.tools
            }
            Err(e) => return Err(map_service_error("list_tools", e)),
        };

        Ok(tools.into_iter().map(map_tool_schema).collect())
    }

    /// Execute a tool on the MCP server.
    pub async fn call_tool(
        &mut self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<McpToolCallResult, SkiffError> {
        self.ensure_initialized()?;
        let session = self.session_ref()?;
        let arguments = coerce_tool_arguments(arguments)?;

        let result = session
            .call_tool(CallToolRequestParams {
                meta: None,
                name: name.to_owned().into(),
                arguments,
                task: None,
            })
            .await
            .map_err(|e| map_service_error("call_tool", e))?;

        map_call_result(name, result)
    }

    fn ensure_initialized(&self) -> Result<(), SkiffError> {
        match self.state {
            McpConnectionState::Initialized => Ok(()),
            McpConnectionState::Closed => Err(SkiffError::Stream("MCP session is closed".into())),
            _ => Err(SkiffError::Stream(
                "MCP client must be initialized first".into(),
            )),
        }
    }

    fn session_ref(&mut self) -> Result<&mut McpRunningService, SkiffError> {
        self.session
            .as_mut()
            .ok_or_else(|| SkiffError::Configuration("Missing MCP session".into()))
    }
}

fn map_tool_schema(tool: rmcp::model::Tool) -> McpToolSchema {
    McpToolSchema {
        name: tool.name.to_string(),
        description: tool.description.map(|d| d.to_string()),
        input_schema: serde_json::Value::Object((*tool.input_schema).clone()),
    }
}

fn coerce_tool_arguments(value: serde_json::Value) -> Result<Option<JsonObject>, SkiffError> {
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Object(map) => Ok(Some(map)),
        serde_json::Value::String(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            let parsed: serde_json::Value = serde_json::from_str(trimmed).map_err(|e| {
                SkiffError::InvalidArgument(format!("MCP tool arguments must be valid JSON: {e}"))
            })?;
            coerce_tool_arguments(parsed)
        }
        other => Err(SkiffError::InvalidArgument(format!(
            "MCP tool arguments must be a JSON object; got {other}"
        ))),
    }
}

fn extract_text_content(content: &[Content]) -> Option<String> {
    let mut lines = Vec::new();
    for item in content {
        if let Some(text) = item.as_text() {
            lines.push(text.text.clone());
            continue;
        }
        if let Some(resource) = item.as_resource() {
            if let ResourceContents::TextResourceContents { text, .. } = &resource.resource {
                lines.push(text.clone());
            }
        }
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

fn map_call_result(name: &str, result: CallToolResult) -> Result<McpToolCallResult, SkiffError> {
    let text_content = extract_text_content(&result.content);
    let content = result
        .content
        .iter()
        .filter_map(|item| serde_json::to_value(item).ok())
        .collect::<Vec<_>>();

    if result.is_error.unwrap_or(false) {
        let message = result
            .structured_content
            .as_ref()
            .map(|v| v.to_string())
            .or_else(|| text_content.clone())
            .unwrap_or_else(|| "MCP tool returned an error result".into());

        return Err(SkiffError::ToolExecution {
            tool_name: name.to_string(),
            message,
        });
    }

    Ok(McpToolCallResult {
        structured_content: result.structured_content,
        text_content,
        content,
    })
}

fn map_client_initialize_error(error: ClientInitializeError) -> SkiffError {
    match error {
        ClientInitializeError::ConnectionClosed(context) => {
            SkiffError::Stream(format!("MCP initialize connection closed: {context}"))
        }
        ClientInitializeError::TransportError { error, context } => SkiffError::Stream(format!(
            "MCP initialize transport error ({context}): {error}"
        )),
        ClientInitializeError::JsonRpcError(error) => SkiffError::upstream(
            "mcp",
            format!(
                "MCP initialize JSON-RPC error {}: {}",
                error.code.0, error.message
            ),
        ),
        ClientInitializeError::Cancelled => SkiffError::Stream("MCP initialize cancelled".into()),
        other => SkiffError::upstream("mcp", format!("MCP initialize error: {other}")),
    }
}

fn map_service_error(context: &str, error: ServiceError) -> SkiffError {
    match error {
        ServiceError::McpError(error) => SkiffError::upstream(
            "mcp",
            format!("{context}: MCP error {}: {}", error.code.0, error.message),
        ),
        ServiceError::TransportSend(error) => {
            SkiffError::Stream(format!("{context}: MCP transport send failed: {error}"))
        }
        ServiceError::TransportClosed => {
            SkiffError::Stream(format!("{context}: MCP transport closed"))
        }
        ServiceError::UnexpectedResponse => {
            SkiffError::upstream("mcp", format!("{context}: unexpected MCP response"))
        }
        ServiceError::Cancelled { reason } => {
            let suffix = reason
                .as_deref()
                .map(|r| format!(" ({r})"))
                .unwrap_or_default();
            SkiffError::Stream(format!("{context}: MCP request cancelled{suffix}"))
        }
        ServiceError::Timeout { timeout } => SkiffError::Timeout(timeout.as_millis() as u64),
        other => SkiffError::upstream("mcp", format!("{context}: MCP service error: {other}")),
    }
}
