//! Bridge MCP tools into the Skiff tool system.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::SkiffError;
use crate::tools::{AgentToolParameters, Tool, ToolArguments, ToolExecutionContext};

use super::client::{McpClient, McpToolCallResult};
use super::schema::McpToolSchema;

/// Execution backend for a bridged tool, mockable in tests.
#[async_trait]
trait McpBackend: Send + Sync {
    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<McpToolCallResult, SkiffError>;
}

#[async_trait]
impl McpBackend for Mutex<McpClient> {
    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<McpToolCallResult, SkiffError> {
        self.lock().await.call_tool(name, arguments).await
    }
}

/// A remotely-discovered tool, indistinguishable from a local one to the
/// agent loop.
struct McpTool {
    name: String,
    description: String,
    parameters: AgentToolParameters,
    backend: Arc<dyn McpBackend>,
}

impl McpTool {
    fn new(schema: McpToolSchema, backend: Arc<dyn McpBackend>) -> Self {
        Self {
            name: schema.name,
            description: schema.description.unwrap_or_default(),
            parameters: AgentToolParameters::from_schema(schema.input_schema),
            backend,
        }
    }
}

#[async_trait]
impl Tool for McpTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &AgentToolParameters {
        &self.parameters
    }

    async fn execute(
        &self,
        args: &ToolArguments,
        _ctx: &ToolExecutionContext,
    ) -> Result<serde_json::Value, SkiffError> {
        let result = self.backend.call_tool(&self.name, args.raw().clone()).await?;
        Ok(result.into_value_or_text())
    }
}

/// List the server's tools and wrap each as a [`Tool`].
///
/// The client is shared behind a mutex; MCP sessions are sequential per
/// connection.
pub async fn discover_tools(client: McpClient) -> Result<Vec<Arc<dyn Tool>>, SkiffError> {
    let client = Arc::new(Mutex::new(client));
    let schemas = client.lock().await.list_tools().await?;
    Ok(schemas
        .into_iter()
        .map(|schema| {
            Arc::new(McpTool::new(schema, client.clone() as Arc<dyn McpBackend>))
                as Arc<dyn Tool>
        })
        .collect())
}
