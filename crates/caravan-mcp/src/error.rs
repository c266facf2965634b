//! Error types for tool providers and the MCP transport

use thiserror::Error;

/// Tool provider errors
#[derive(Error, Debug)]
pub enum Error {
    /// No provider serves the named tool
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// A tool with the same name is already registered
    #[error("duplicate tool name: {0}")]
    DuplicateTool(String),

    /// Tool arguments failed validation
    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments {
        /// Tool name
        tool: String,
        /// What was wrong
        reason: String,
    },

    /// The remote server returned a JSON-RPC error
    #[error("server error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code
        code: i64,
        /// Error message
        message: String,
    },

    /// Transport-level failure
    #[error("transport error: {0}")]
    Transport(String),

    /// The SSE handshake did not produce a message endpoint
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// Response payload could not be decoded
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The request timed out
    #[error("request timed out after {0} seconds")]
    Timeout(u64),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for tool provider operations
pub type Result<T> = std::result::Result<T, Error>;
