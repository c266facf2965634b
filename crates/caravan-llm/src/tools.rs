//! Tool types for model function calling

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Tool definition advertised to the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name
    pub name: String,
    /// Tool description
    pub description: String,
    /// JSON schema for parameters
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Create a new tool definition
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// A tool call requested by the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique ID for this tool call
    pub id: String,
    /// Tool name
    pub name: String,
    /// Arguments as JSON string
    pub arguments: String,
}

impl ToolCall {
    /// Parse arguments as a typed value
    pub fn parse_arguments<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.arguments).map_err(|e| Error::InvalidResponse(e.to_string()))
    }

    /// Parse arguments as a raw JSON value, tolerating an empty string
    pub fn arguments_value(&self) -> Result<serde_json::Value> {
        if self.arguments.trim().is_empty() {
            return Ok(serde_json::json!({}));
        }
        serde_json::from_str(&self.arguments).map_err(|e| Error::InvalidResponse(e.to_string()))
    }
}

/// Tool choice strategy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    /// Let the model decide
    #[default]
    Auto,
    /// Don't use tools
    None,
    /// Force the model to call a tool
    Required,
    /// Use a specific tool by name
    Tool(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_definition() {
        let tool = ToolDefinition::new(
            "knowledge-base",
            "Look up an answer in the knowledge base",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "question": {"type": "string"}
                },
                "required": ["question"]
            }),
        );

        assert_eq!(tool.name, "knowledge-base");
        assert!(tool.parameters.get("properties").is_some());
    }

    #[test]
    fn test_tool_call_parse_arguments() {
        let tool_call = ToolCall {
            id: "call_123".to_string(),
            name: "knowledge-base".to_string(),
            arguments: r#"{"question": "What is the capital of France?"}"#.to_string(),
        };

        #[derive(Deserialize)]
        struct Args {
            question: String,
        }

        let args: Args = tool_call.parse_arguments().unwrap();
        assert!(args.question.contains("France"));
    }

    #[test]
    fn test_empty_arguments_value() {
        let tool_call = ToolCall {
            id: "call_1".to_string(),
            name: "now".to_string(),
            arguments: String::new(),
        };
        assert_eq!(tool_call.arguments_value().unwrap(), serde_json::json!({}));
    }
}
