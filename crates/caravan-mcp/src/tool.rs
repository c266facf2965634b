//! Tool descriptors, requests and outcomes

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Description of a tool a provider offers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool name, unique within a registry
    pub name: String,
    /// Human-readable description, shown to the model
    pub description: String,
    /// JSON schema for the tool arguments
    pub parameters: Value,
    /// Whether a human must approve each invocation
    #[serde(default)]
    pub requires_approval: bool,
}

impl ToolDescriptor {
    /// Create a new descriptor
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            requires_approval: false,
        }
    }

    /// Require human approval for every invocation of this tool
    #[must_use]
    pub fn with_approval_required(mut self) -> Self {
        self.requires_approval = true;
        self
    }

    /// Convert to the definition format advertised to chat models
    #[must_use]
    pub fn to_definition(&self) -> caravan_llm::ToolDefinition {
        caravan_llm::ToolDefinition::new(
            self.name.clone(),
            self.description.clone(),
            self.parameters.clone(),
        )
    }
}

/// A single tool invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRequest {
    /// Correlation id, usually the model's tool call id
    pub id: String,
    /// Tool name
    pub name: String,
    /// Parsed arguments
    pub arguments: Value,
}

impl ToolRequest {
    /// Create a new request
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// What a tool invocation produced
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ToolOutcome {
    /// The tool found an answer
    Answer {
        /// Answer text to feed back to the model
        text: String,
        /// Optional structured payload
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
    /// The tool ran but found nothing relevant
    NoMatch,
}

impl ToolOutcome {
    /// An answer with text only
    #[must_use]
    pub fn answer(text: impl Into<String>) -> Self {
        Self::Answer {
            text: text.into(),
            data: None,
        }
    }

    /// True when the tool produced an answer
    #[must_use]
    pub fn is_answer(&self) -> bool {
        matches!(self, Self::Answer { .. })
    }

    /// The answer text, if any
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Answer { text, .. } => Some(text),
            Self::NoMatch => None,
        }
    }
}
