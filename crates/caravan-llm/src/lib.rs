//! Caravan LLM - Chat Client Abstraction
//!
//! This crate provides the model integration for Caravan:
//! - Client: the `ChatClient` trait all model backends implement
//! - OpenAI: OpenAI-compatible chat completions (GitHub Models, Azure OpenAI)
//! - Mock: scripted client for deterministic tests

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod completion;
pub mod error;
pub mod message;
pub mod mock;
pub mod openai;
pub mod tools;

pub use client::ChatClient;
pub use completion::{
    CompletionRequest, CompletionResponse, TokenUsage, ToolCompletionRequest,
    ToolCompletionResponse,
};
pub use error::{Error, Result};
pub use message::{Message, MessageRole};
pub use mock::ScriptedClient;
pub use openai::{OpenAiChatClient, OpenAiConfig};
pub use tools::{ToolCall, ToolChoice, ToolDefinition};
