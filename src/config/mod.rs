//! Runtime configuration, resolved from the environment at startup.

use crate::error::{Result, SkiffError};

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

/// Service configuration.
///
/// Resolved once in `main` and injected into the service state; request
/// handlers never consult the environment.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Address the HTTP server binds.
    pub listen_addr: String,
    /// Base URL of the hosted model runtime.
    pub model_runtime_url: String,
    /// Model id override; `None` keeps the built-in default.
    pub model_id: Option<String>,
    /// Base URL of the code sandbox.
    pub sandbox_url: String,
    /// Memory service id; memory is disabled when absent.
    pub memory_id: Option<String>,
    /// Base URL of the memory service; required when `memory_id` is set.
    pub memory_url: Option<String>,
    /// MCP server endpoint; remote tool discovery is skipped when absent.
    pub mcp_server_url: Option<String>,
}

impl RuntimeConfig {
    /// Load from environment variables (`SKIFF_*`), reading `.env` if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let config = Self {
            listen_addr: lookup("SKIFF_LISTEN_ADDR")
                .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string()),
            model_runtime_url: lookup("SKIFF_MODEL_RUNTIME_URL").ok_or_else(|| {
                SkiffError::Configuration("SKIFF_MODEL_RUNTIME_URL is required".into())
            })?,
            model_id: lookup("SKIFF_MODEL_ID"),
            sandbox_url: lookup("SKIFF_SANDBOX_URL").ok_or_else(|| {
                SkiffError::Configuration("SKIFF_SANDBOX_URL is required".into())
            })?,
            memory_id: lookup("SKIFF_MEMORY_ID"),
            memory_url: lookup("SKIFF_MEMORY_URL"),
            mcp_server_url: lookup("SKIFF_MCP_SERVER_URL"),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.memory_id.is_some() && self.memory_url.is_none() {
            return Err(SkiffError::Configuration(
                "SKIFF_MEMORY_URL is required when SKIFF_MEMORY_ID is set".into(),
            ));
        }
        Ok(())
    }
}
