//! Chat client trait definition

use crate::completion::{
    CompletionRequest, CompletionResponse, ToolCompletionRequest, ToolCompletionResponse,
};
use crate::error::Result;

/// Trait for chat model backends
#[async_trait::async_trait]
pub trait ChatClient: Send + Sync {
    /// Get the client name
    fn name(&self) -> &str;

    /// Check if the backend supports function calling/tools
    fn supports_tools(&self) -> bool;

    /// Get the default model (deployment name)
    fn default_model(&self) -> &str;

    /// Complete a conversation (text only)
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Complete a conversation with tools
    async fn complete_with_tools(
        &self,
        request: ToolCompletionRequest,
    ) -> Result<ToolCompletionResponse>;
}
