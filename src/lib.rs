//! Skiff — streaming agent invocation service
//!
//! A thin service that wires a hosted model runtime, conversational memory,
//! a remote code sandbox, and MCP-discovered tools into one tool-using agent
//! loop, and streams the visible portion of the answer to the caller. Text
//! inside `<thinking>...</thinking>` spans never reaches the client; the
//! [`filter`] module holds the state machine that guarantees it.
//!
//! # Quick Start
//!
//! ```no_run
//! use skiff::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example(runtime: Arc<dyn skiff::model::ModelRuntime>) -> skiff::error::Result<()> {
//! use futures::StreamExt;
//!
//! let agent = Agent::new(runtime).with_system_prompt("You are a helpful assistant.");
//! let mut events = agent.stream("Hello!");
//! while let Some(event) = events.next().await {
//!     if let AgentEvent::Delta { text } = event? {
//!         print!("{text}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod filter;
pub mod http;
pub mod mcp;
pub mod memory;
pub mod model;
pub mod prelude;
pub mod sandbox;
pub mod service;
pub mod tools;
pub mod types;
