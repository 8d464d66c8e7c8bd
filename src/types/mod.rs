//! Core types for Skiff.

pub mod message;
pub mod metrics;
pub mod request;
pub mod stream;

pub use message::*;
pub use metrics::*;
pub use request::*;
pub use stream::*;
