//! Provider registry and tool dispatch

use crate::error::{Error, Result};
use crate::provider::ToolProvider;
use crate::tool::{ToolDescriptor, ToolOutcome, ToolRequest};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Routes tool requests to the provider that owns the tool.
///
/// Tool names are unique across the registry; registering a provider whose
/// tool name collides with an existing one is an error.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn ToolProvider>>,
    // tool name -> index into providers
    routes: HashMap<String, usize>,
}

impl ProviderRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider and index its tools
    pub fn register(&mut self, provider: Arc<dyn ToolProvider>) -> Result<()> {
        let index = self.providers.len();
        for descriptor in provider.tools() {
            if self.routes.contains_key(&descriptor.name) {
                return Err(Error::DuplicateTool(descriptor.name));
            }
            self.routes.insert(descriptor.name, index);
        }
        debug!(provider = provider.name(), "Registered tool provider");
        self.providers.push(provider);
        Ok(())
    }

    /// All tool descriptors across providers
    #[must_use]
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.providers.iter().flat_map(|p| p.tools()).collect()
    }

    /// Tool definitions in the format chat models consume
    #[must_use]
    pub fn to_llm_tools(&self) -> Vec<caravan_llm::ToolDefinition> {
        self.descriptors().iter().map(ToolDescriptor::to_definition).collect()
    }

    /// Name of the provider that owns a tool
    #[must_use]
    pub fn provider_for(&self, tool_name: &str) -> Option<&str> {
        self.routes
            .get(tool_name)
            .map(|&i| self.providers[i].name())
    }

    /// Descriptor for a tool, if registered
    #[must_use]
    pub fn descriptor(&self, tool_name: &str) -> Option<ToolDescriptor> {
        self.routes.get(tool_name).and_then(|&i| {
            self.providers[i]
                .tools()
                .into_iter()
                .find(|d| d.name == tool_name)
        })
    }

    /// True when a tool with this name is registered
    #[must_use]
    pub fn contains(&self, tool_name: &str) -> bool {
        self.routes.contains_key(tool_name)
    }

    /// Dispatch a request to the owning provider
    #[instrument(skip(self, request), fields(tool = %request.name))]
    pub async fn dispatch(&self, request: ToolRequest) -> Result<ToolOutcome> {
        let index = *self
            .routes
            .get(&request.name)
            .ok_or_else(|| Error::UnknownTool(request.name.clone()))?;
        self.providers[index].call(request).await
    }
}
