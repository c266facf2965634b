//! Tool-calling chat agents

mod chat_agent;
mod types;

pub use chat_agent::ChatAgent;
pub use types::{AgentConfig, AgentRunResult, AgentThread, ToolCallRecord};
