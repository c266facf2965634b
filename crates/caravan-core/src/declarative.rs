//! Declarative agent definitions loaded from YAML

use crate::agent::{AgentConfig, ChatAgent};
use crate::approval::ApprovalManager;
use crate::error::{Error, Result};
use crate::event_bus::EventBus;
use caravan_llm::ChatClient;
use caravan_mcp::ProviderRegistry;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// A declarative agent definition.
///
/// ```yaml
/// name: assistant
/// instructions: |
///   Answer factual questions using the knowledge base.
/// model: gpt-4o-mini
/// tools:
///   - knowledge-base
/// max_rounds: 8
/// temperature: 0.2
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSpec {
    /// Agent name
    pub name: String,
    /// System instructions
    pub instructions: String,
    /// Model override
    #[serde(default)]
    pub model: Option<String>,
    /// Tools the agent may call; must exist in the registry
    #[serde(default)]
    pub tools: Vec<String>,
    /// Tool-round limit override
    #[serde(default)]
    pub max_rounds: Option<usize>,
    /// Sampling temperature
    #[serde(default)]
    pub temperature: Option<f32>,
}

impl AgentSpec {
    /// Parse a spec from YAML text
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let spec: Self = serde_yaml::from_str(yaml)?;
        if spec.name.trim().is_empty() {
            return Err(Error::InvalidSpec("agent name is empty".to_string()));
        }
        if spec.instructions.trim().is_empty() {
            return Err(Error::InvalidSpec(format!(
                "agent {} has no instructions",
                spec.name
            )));
        }
        Ok(spec)
    }

    /// Load a spec from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }
}

/// Builds [`ChatAgent`]s from specs against a shared client and registry.
pub struct AgentFactory {
    client: Arc<dyn ChatClient>,
    registry: Arc<ProviderRegistry>,
    event_bus: Option<EventBus>,
    approvals: Option<Arc<ApprovalManager>>,
}

impl AgentFactory {
    /// Create a factory
    #[must_use]
    pub fn new(client: Arc<dyn ChatClient>, registry: Arc<ProviderRegistry>) -> Self {
        Self {
            client,
            registry,
            event_bus: None,
            approvals: None,
        }
    }

    /// Wire built agents to an event bus
    #[must_use]
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Wire built agents to an approval manager
    #[must_use]
    pub fn with_approvals(mut self, approvals: Arc<ApprovalManager>) -> Self {
        self.approvals = Some(approvals);
        self
    }

    /// Build an agent from a spec.
    ///
    /// Every tool named in the spec must exist in the registry; an unknown
    /// name fails fast rather than surfacing at call time.
    pub fn build(&self, spec: &AgentSpec) -> Result<ChatAgent> {
        for tool in &spec.tools {
            if !self.registry.contains(tool) {
                return Err(Error::UnknownSpecTool {
                    spec: spec.name.clone(),
                    tool: tool.clone(),
                });
            }
        }

        let mut config = AgentConfig {
            model: spec.model.clone(),
            temperature: spec.temperature,
            ..AgentConfig::default()
        };
        if let Some(max_rounds) = spec.max_rounds {
            config.max_rounds = max_rounds;
        }

        let mut agent = ChatAgent::new(
            spec.name.clone(),
            spec.instructions.clone(),
            Arc::clone(&self.client),
            Arc::clone(&self.registry),
        )
        .with_config(config);

        if !spec.tools.is_empty() {
            agent = agent.with_allowed_tools(spec.tools.clone());
        }
        if let Some(bus) = &self.event_bus {
            agent = agent.with_event_bus(bus.clone());
        }
        if let Some(approvals) = &self.approvals {
            agent = agent.with_approvals(Arc::clone(approvals));
        }

        debug!(agent = %spec.name, tools = spec.tools.len(), "Built agent from spec");
        Ok(agent)
    }

    /// Load a spec file and build the agent
    pub fn build_from_file(&self, path: impl AsRef<Path>) -> Result<ChatAgent> {
        let spec = AgentSpec::from_file(path)?;
        self.build(&spec)
    }
}
