//! Error types for Skiff.

use thiserror::Error;

/// Primary error type for all Skiff operations.
#[derive(Error, Debug)]
pub enum SkiffError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Tool execution error: {tool_name}: {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Upstream error: {service}: {message}")]
    Upstream { service: String, message: String },

    #[error("Timeout after {0}ms")]
    Timeout(u64),
}

impl SkiffError {
    /// Create an API error from a status code and message.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create an upstream-service error.
    pub fn upstream(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upstream {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Whether retrying the operation could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) => true,
            Self::Api { status, .. } => matches!(status, 429 | 500..=599),
            _ => false,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, SkiffError>;
