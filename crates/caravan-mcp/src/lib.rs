//! Tool providers and MCP transport for caravan
//!
//! A [`ToolProvider`] exposes a set of named tools an agent may call. Providers
//! can live in-process (see [`KnowledgeBase`]) or behind an MCP server reached
//! over SSE (see [`SseProviderClient`] and [`server`]).

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod knowledge_base;
pub mod provider;
pub mod registry;
pub mod rpc;
pub mod server;
pub mod sse;
pub mod tool;

pub use error::{Error, Result};
pub use knowledge_base::KnowledgeBase;
pub use provider::ToolProvider;
pub use registry::ProviderRegistry;
pub use server::{serve, McpServerState};
pub use sse::SseProviderClient;
pub use tool::{ToolDescriptor, ToolOutcome, ToolRequest};
