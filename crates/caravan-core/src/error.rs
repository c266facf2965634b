//! Core error types

use thiserror::Error;

/// Errors from agents, the moderator and workflows
#[derive(Error, Debug)]
pub enum Error {
    /// Chat backend failure
    #[error("model error: {0}")]
    Llm(#[from] caravan_llm::Error),

    /// Tool provider failure
    #[error("tool error: {0}")]
    Tool(#[from] caravan_mcp::Error),

    /// Agent exceeded its tool-call round limit
    #[error("agent {agent} exceeded {max_rounds} tool rounds")]
    TooManyRounds {
        /// Agent name
        agent: String,
        /// Configured limit
        max_rounds: usize,
    },

    /// A declarative agent spec referenced an unknown tool
    #[error("agent spec {spec} references unknown tool: {tool}")]
    UnknownSpecTool {
        /// Spec name
        spec: String,
        /// The missing tool
        tool: String,
    },

    /// Spec file could not be parsed
    #[error("invalid agent spec: {0}")]
    InvalidSpec(String),

    /// A tool invocation was denied by the human reviewer
    #[error("tool call denied: {0}")]
    ApprovalDenied(String),

    /// The moderator could not assemble a plan
    #[error("planning failed: {0}")]
    Planning(String),

    /// A specialist produced an unusable proposal
    #[error("specialist {specialist} returned an invalid proposal: {reason}")]
    InvalidProposal {
        /// Specialist name
        specialist: String,
        /// What was wrong
        reason: String,
    },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse error
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON error
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, Error>;
