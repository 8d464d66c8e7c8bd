//! Remote code-execution sandbox, exposed to the agent as a tool.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Result, SkiffError};
use crate::http::{shared_client, status_to_error};
use crate::tools::{AgentToolParameters, Tool, ToolArguments, ToolExecutionContext};

pub const CODE_INTERPRETER_TOOL: &str = "code_interpreter";

/// Languages the sandbox executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SandboxLanguage {
    Python,
    Javascript,
    Typescript,
}

/// Sandbox client configuration.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    pub base_url: String,
    /// Sandbox sessions are keyed by the invocation's session id.
    pub session_name: String,
    /// Create the session on first execute instead of failing.
    pub auto_create: bool,
    /// Leave the session running for later invocations.
    pub persist_session: bool,
}

impl SandboxConfig {
    pub fn new(base_url: impl Into<String>, session_name: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            session_name: session_name.into(),
            auto_create: true,
            persist_session: true,
        }
    }
}

#[derive(Serialize)]
struct ExecuteRequest<'a> {
    code: &'a str,
    language: SandboxLanguage,
}

#[derive(Debug, Deserialize)]
pub struct ExecutionOutcome {
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    #[serde(default)]
    pub exit_code: i32,
}

/// Client for the remote code-execution sandbox.
///
/// The sandbox session is created lazily on first use and cached for the
/// lifetime of this client.
pub struct CodeInterpreter {
    config: SandboxConfig,
    session: Mutex<Option<String>>,
    parameters: AgentToolParameters,
}

impl CodeInterpreter {
    pub fn new(config: SandboxConfig) -> Self {
        let parameters = AgentToolParameters::object()
            .string("code", "Source code to execute in the sandbox", true)
            .string_enum(
                "language",
                "Language to execute (defaults to python)",
                &["python", "javascript", "typescript"],
                false,
            )
            .build();
        Self {
            config,
            session: Mutex::new(None),
            parameters,
        }
    }

    async fn ensure_session(&self) -> Result<String> {
        let mut session = self.session.lock().await;
        if let Some(id) = session.as_ref() {
            return Ok(id.clone());
        }
        if !self.config.auto_create {
            return Err(SkiffError::upstream(
                "sandbox",
                format!("no session '{}' and auto-create is off", self.config.session_name),
            ));
        }

        let url = format!("{}/sessions", self.config.base_url.trim_end_matches('/'));
        let resp = shared_client()
            .post(&url)
            .json(&serde_json::json!({
                "name": self.config.session_name,
                "persist": self.config.persist_session,
            }))
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !(200..300).contains(&status) {
            let body = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body));
        }

        let created: serde_json::Value = resp.json().await?;
        let id = created
            .get("session_id")
            .and_then(|v| v.as_str())
            .unwrap_or(&self.config.session_name)
            .to_string();
        info!(session = id.as_str(), "sandbox session ready");
        *session = Some(id.clone());
        Ok(id)
    }

    /// Execute code in the sandbox session.
    pub async fn execute_code(
        &self,
        code: &str,
        language: SandboxLanguage,
    ) -> Result<ExecutionOutcome> {
        let session_id = self.ensure_session().await?;
        let url = format!(
            "{}/sessions/{session_id}/execute",
            self.config.base_url.trim_end_matches('/')
        );

        debug!(session = session_id.as_str(), %language, "sandbox execute");

        let resp = shared_client()
            .post(&url)
            .json(&ExecuteRequest { code, language })
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body));
        }

        Ok(resp.json().await?)
    }
}

#[async_trait]
impl Tool for CodeInterpreter {
    fn name(&self) -> &str {
        CODE_INTERPRETER_TOOL
    }

    fn description(&self) -> &str {
        "Execute code in a sandboxed interpreter and return its output"
    }

    fn parameters(&self) -> &AgentToolParameters {
        &self.parameters
    }

    async fn execute(
        &self,
        args: &ToolArguments,
        _ctx: &ToolExecutionContext,
    ) -> Result<serde_json::Value> {
        let code = args.get_str("code")?;
        let language = match args.get_str_opt("language") {
            Some(raw) => raw.parse::<SandboxLanguage>().map_err(|_| {
                SkiffError::InvalidArgument(format!("unsupported language: {raw}"))
            })?,
            None => SandboxLanguage::Python,
        };

        let outcome =
            self.execute_code(code, language)
                .await
                .map_err(|e| SkiffError::ToolExecution {
                    tool_name: CODE_INTERPRETER_TOOL.into(),
                    message: e.to_string(),
                })?;

        Ok(serde_json::json!({
            "stdout": outcome.stdout,
            "stderr": outcome.stderr,
            "exit_code": outcome.exit_code,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_parses_from_lowercase() {
        assert_eq!(
            "python".parse::<SandboxLanguage>().unwrap(),
            SandboxLanguage::Python
        );
        assert_eq!(
            "typescript".parse::<SandboxLanguage>().unwrap(),
            SandboxLanguage::Typescript
        );
        assert!("cobol".parse::<SandboxLanguage>().is_err());
    }

    #[test]
    fn tool_surface_matches_contract() {
        let tool = CodeInterpreter::new(SandboxConfig::new("http://sandbox", "sess-1"));
        assert_eq!(tool.name(), CODE_INTERPRETER_TOOL);
        assert_eq!(tool.parameters().schema["type"], "object");
        assert_eq!(
            tool.parameters().schema["required"],
            serde_json::json!(["code"])
        );
    }
}
