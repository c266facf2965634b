//! The tool provider trait

use crate::error::Result;
use crate::tool::{ToolDescriptor, ToolOutcome, ToolRequest};

/// A source of callable tools.
///
/// Implementations may run in-process or proxy to a remote MCP server. A
/// provider owns one or more named tools and executes requests against them.
#[async_trait::async_trait]
pub trait ToolProvider: Send + Sync {
    /// Provider name, used when citing answer sources
    fn name(&self) -> &str;

    /// Tools this provider offers
    fn tools(&self) -> Vec<ToolDescriptor>;

    /// Execute a tool request.
    ///
    /// Returns [`ToolOutcome::NoMatch`] when the tool ran but has nothing
    /// relevant; errors are reserved for invocation failures.
    async fn call(&self, request: ToolRequest) -> Result<ToolOutcome>;
}
