//! Agent configuration, threads and run results

use caravan_llm::Message;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Reply used when every tool lookup came back empty
pub const NO_ANSWER_REPLY: &str =
    "I could not find an answer to that question. Please try rephrasing it.";

/// Tunables for a chat agent
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Model override; falls back to the client default when `None`
    pub model: Option<String>,
    /// Maximum tool-call rounds before the run is aborted
    pub max_rounds: usize,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Token cap per completion
    pub max_tokens: Option<u32>,
    /// Reply returned when all tool lookups find nothing
    pub no_match_reply: String,
    /// How long to wait for a human decision on gated tools
    pub approval_timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: None,
            max_rounds: 8,
            temperature: None,
            max_tokens: None,
            no_match_reply: NO_ANSWER_REPLY.to_string(),
            approval_timeout_secs: 300,
        }
    }
}

/// Conversation history carried across turns
#[derive(Debug, Clone, Default)]
pub struct AgentThread {
    /// Messages accumulated so far
    pub messages: Vec<Message>,
}

impl AgentThread {
    /// Create an empty thread
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a thread seeded with system instructions
    #[must_use]
    pub fn with_instructions(instructions: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(instructions)],
        }
    }

    /// Append a message
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Number of messages
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True when the thread has no messages
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// One executed tool call, kept for the run log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRecord {
    /// Tool call id from the model
    pub tool_call_id: String,
    /// Tool name
    pub tool_name: String,
    /// Provider that served the call
    pub provider: String,
    /// Arguments as parsed JSON
    pub arguments: Value,
    /// Whether the tool produced an answer
    pub matched: bool,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

/// Outcome of one agent run
#[derive(Debug, Clone)]
pub struct AgentRunResult {
    /// Run identifier
    pub run_id: Uuid,
    /// Agent name
    pub agent: String,
    /// Final reply text
    pub reply: String,
    /// Tool calls executed during the run, in order
    pub tool_calls: Vec<ToolCallRecord>,
    /// Completion rounds consumed
    pub rounds: usize,
}

impl AgentRunResult {
    /// Providers that contributed answers, deduplicated in call order
    #[must_use]
    pub fn answer_sources(&self) -> Vec<&str> {
        let mut sources = Vec::new();
        for record in &self.tool_calls {
            if record.matched && !sources.contains(&record.provider.as_str()) {
                sources.push(record.provider.as_str());
            }
        }
        sources
    }
}
