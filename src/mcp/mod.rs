//! Model Context Protocol client for remote tool discovery.
//!
//! Connected once at service startup over the streamable-HTTP transport and
//! injected into request handlers; discovered tools are bridged into the
//! crate's [`Tool`](crate::tools::Tool) abstraction so the agent loop treats
//! them like local tools.

pub mod bridge;
pub mod client;
pub mod schema;

pub use bridge::discover_tools;
pub use client::{McpClient, McpConnectionState, McpToolCallResult};
pub use schema::McpToolSchema;
