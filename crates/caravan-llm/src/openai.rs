//! OpenAI-compatible chat client
//!
//! Speaks the `/chat/completions` wire format against either GitHub Models
//! (`GITHUB_TOKEN`) or an Azure OpenAI deployment (`AZURE_OPENAI_API_KEY` +
//! `AZURE_OPENAI_ENDPOINT`), in that precedence order.

use crate::client::ChatClient;
use crate::completion::{
    CompletionRequest, CompletionResponse, TokenUsage, ToolCompletionRequest,
    ToolCompletionResponse,
};
use crate::error::{Error, Result};
use crate::message::Message;
use crate::tools::{ToolCall, ToolChoice, ToolDefinition};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument};

/// GitHub Models inference endpoint
pub const GITHUB_MODELS_BASE: &str = "https://models.github.ai/inference";

/// Fallback model when no deployment name is configured
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

/// Mask a token for debug output, keeping only a short prefix
fn mask_token(token: &str) -> String {
    if token.chars().count() <= 8 {
        "****".to_string()
    } else {
        let prefix: String = token.chars().take(4).collect();
        format!("{prefix}****")
    }
}

/// Sanitize API error messages before they reach logs or users
fn sanitize_api_error(error: &str) -> String {
    let lower = error.to_lowercase();

    if lower.contains("api key")
        || lower.contains("unauthorized")
        || lower.contains("authentication")
        || lower.contains("401")
    {
        return "API authentication error. Check GITHUB_TOKEN or AZURE_OPENAI_API_KEY.".to_string();
    }

    if lower.contains("rate limit") || lower.contains("quota") || lower.contains("429") {
        return "Model rate limit exceeded. Try again later.".to_string();
    }

    if error.len() > 300 {
        let cut: String = error.chars().take(300).collect();
        format!("{cut}...(truncated)")
    } else {
        error.to_string()
    }
}

/// OpenAI-compatible client configuration
#[derive(Clone)]
pub struct OpenAiConfig {
    /// Bearer token or Azure API key
    pub token: String,
    /// Base URL for the chat completions API
    pub base_url: String,
    /// Default model / deployment name
    pub default_model: String,
    /// Request timeout
    pub timeout: Duration,
}

impl fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("token", &mask_token(&self.token))
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl OpenAiConfig {
    /// Create a configuration from an explicit token and base URL
    #[must_use]
    pub fn new(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_url: base_url.into(),
            default_model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(120),
        }
    }

    /// Resolve credentials from the environment.
    ///
    /// `GITHUB_TOKEN` wins over `AZURE_OPENAI_API_KEY`/`AZURE_OPENAI_ENDPOINT`.
    /// The model comes from `COMPLETION_DEPLOYMENT_NAME` when set.
    pub fn from_env() -> Result<Self> {
        let (token, base_url) = if let Ok(token) = std::env::var("GITHUB_TOKEN") {
            (token, GITHUB_MODELS_BASE.to_string())
        } else if let Ok(key) = std::env::var("AZURE_OPENAI_API_KEY") {
            let endpoint = std::env::var("AZURE_OPENAI_ENDPOINT").map_err(|_| {
                Error::NotConfigured("AZURE_OPENAI_ENDPOINT not set".to_string())
            })?;
            (key, endpoint)
        } else {
            return Err(Error::NotConfigured(
                "set GITHUB_TOKEN or AZURE_OPENAI_API_KEY".to_string(),
            ));
        };

        let default_model = std::env::var("COMPLETION_DEPLOYMENT_NAME")
            .unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        Ok(Self {
            token,
            base_url,
            default_model,
            timeout: Duration::from_secs(120),
        })
    }

    /// Set the default model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Set the timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// Chat completions wire types
#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ChatTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    r#type: String,
    function: WireFunctionCall,
}

#[derive(Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Serialize)]
struct ChatTool {
    r#type: String,
    function: ChatFunction,
}

#[derive(Serialize)]
struct ChatFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
    model: String,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

/// OpenAI-compatible chat client
pub struct OpenAiChatClient {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiChatClient {
    /// Create a new client
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(OpenAiConfig::from_env()?)
    }

    fn convert_message(msg: &Message) -> ChatMessage {
        let tool_calls = if msg.tool_calls.is_empty() {
            None
        } else {
            Some(
                msg.tool_calls
                    .iter()
                    .map(|c| WireToolCall {
                        id: c.id.clone(),
                        r#type: "function".to_string(),
                        function: WireFunctionCall {
                            name: c.name.clone(),
                            arguments: c.arguments.clone(),
                        },
                    })
                    .collect(),
            )
        };
        ChatMessage {
            role: msg.role.as_str().to_string(),
            content: msg.content.clone(),
            tool_call_id: msg.tool_call_id.clone(),
            name: msg.name.clone(),
            tool_calls,
        }
    }

    fn convert_tool(tool: &ToolDefinition) -> ChatTool {
        ChatTool {
            r#type: "function".to_string(),
            function: ChatFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.parameters.clone(),
            },
        }
    }

    fn convert_tool_choice(choice: &ToolChoice) -> Option<serde_json::Value> {
        match choice {
            ToolChoice::Auto => Some(serde_json::json!("auto")),
            ToolChoice::None => Some(serde_json::json!("none")),
            ToolChoice::Required => Some(serde_json::json!("required")),
            ToolChoice::Tool(name) => Some(serde_json::json!({
                "type": "function",
                "function": {"name": name}
            })),
        }
    }

    async fn send(&self, chat_request: &ChatRequest) -> Result<ChatResponse> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .header("Authorization", format!("Bearer {}", self.config.token))
            .header("Content-Type", "application/json")
            .json(chat_request)
            .send()
            .await
            .map_err(|e| Error::Network(sanitize_api_error(&e.to_string())))?;

        if response.status().as_u16() == 429 {
            return Err(Error::RateLimit);
        }
        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Api(sanitize_api_error(&error_text)));
        }

        response
            .json()
            .await
            .map_err(|e| Error::InvalidResponse(e.to_string()))
    }
}

#[async_trait::async_trait]
impl ChatClient for OpenAiChatClient {
    fn name(&self) -> &str {
        "openai"
    }

    fn supports_tools(&self) -> bool {
        true
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let model = if request.model.is_empty() {
            self.config.default_model.clone()
        } else {
            request.model.clone()
        };

        let chat_request = ChatRequest {
            model,
            messages: request.messages.iter().map(Self::convert_message).collect(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            tools: None,
            tool_choice: None,
        };

        debug!("Sending completion request");
        let chat_response = self.send(&chat_request).await?;

        let choice = chat_response
            .choices
            .first()
            .ok_or_else(|| Error::InvalidResponse("no choices in response".to_string()))?;

        Ok(CompletionResponse {
            content: choice.message.content.clone().unwrap_or_default(),
            usage: chat_response.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            finish_reason: choice.finish_reason.clone(),
            model: chat_response.model,
        })
    }

    #[instrument(skip(self, request), fields(model = %request.request.model, tools = request.tools.len()))]
    async fn complete_with_tools(
        &self,
        request: ToolCompletionRequest,
    ) -> Result<ToolCompletionResponse> {
        let model = if request.request.model.is_empty() {
            self.config.default_model.clone()
        } else {
            request.request.model.clone()
        };

        let tools: Vec<ChatTool> = request.tools.iter().map(Self::convert_tool).collect();
        let chat_request = ChatRequest {
            model,
            messages: request
                .request
                .messages
                .iter()
                .map(Self::convert_message)
                .collect(),
            max_tokens: request.request.max_tokens,
            temperature: request.request.temperature,
            tools: if tools.is_empty() { None } else { Some(tools) },
            tool_choice: if request.tools.is_empty() {
                None
            } else {
                Self::convert_tool_choice(&request.tool_choice)
            },
        };

        debug!("Sending tool completion request");
        let chat_response = self.send(&chat_request).await?;

        let choice = chat_response
            .choices
            .first()
            .ok_or_else(|| Error::InvalidResponse("no choices in response".to_string()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .as_ref()
            .map(|calls| {
                calls
                    .iter()
                    .map(|c| ToolCall {
                        id: c.id.clone(),
                        name: c.function.name.clone(),
                        arguments: c.function.arguments.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(ToolCompletionResponse {
            content: choice.message.content.clone(),
            tool_calls,
            usage: chat_response.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            finish_reason: choice.finish_reason.clone(),
            model: chat_response.model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("short"), "****");
        assert_eq!(mask_token("ghp_abcdefgh12345"), "ghp_****");
    }

    #[test]
    fn test_mask_token_multibyte() {
        // Byte 4 falls inside a multibyte character; masking must not slice there.
        assert_eq!(mask_token("ab–cdefghijk"), "ab–c****");
        assert_eq!(mask_token("秘密の鍵"), "****");
    }

    #[test]
    fn test_sanitize_api_error() {
        let msg = sanitize_api_error("401 unauthorized: bad api key sk-foo");
        assert!(msg.contains("authentication"));
        assert!(!msg.contains("sk-foo"));

        let msg = sanitize_api_error("rate limit exceeded for model");
        assert!(msg.contains("rate limit"));
    }

    #[test]
    fn test_config_debug_masks_token() {
        let config = OpenAiConfig::new("ghp_secret_token_value", GITHUB_MODELS_BASE);
        let dump = format!("{config:?}");
        assert!(!dump.contains("secret_token_value"));
    }

    #[test]
    fn test_convert_tool_choice() {
        let auto = OpenAiChatClient::convert_tool_choice(&ToolChoice::Auto);
        assert_eq!(auto, Some(serde_json::json!("auto")));

        let named = OpenAiChatClient::convert_tool_choice(&ToolChoice::Tool("kb".to_string()));
        assert_eq!(
            named.unwrap()["function"]["name"],
            serde_json::json!("kb")
        );
    }
}
