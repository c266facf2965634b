//! Scripted client for deterministic tests

use crate::client::ChatClient;
use crate::completion::{
    CompletionRequest, CompletionResponse, ToolCompletionRequest, ToolCompletionResponse,
};
use crate::error::{Error, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A chat client that replays a queue of scripted responses.
///
/// Each call to [`ChatClient::complete_with_tools`] pops the next queued
/// response. Plain [`ChatClient::complete`] calls reuse the same queue and
/// return its text content.
#[derive(Clone, Default)]
pub struct ScriptedClient {
    responses: Arc<Mutex<VecDeque<ToolCompletionResponse>>>,
    requests: Arc<Mutex<Vec<ToolCompletionRequest>>>,
}

impl ScriptedClient {
    /// Create an empty scripted client
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response to be returned by the next completion call
    pub fn push_response(&self, response: ToolCompletionResponse) {
        self.responses
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push_back(response);
    }

    /// Queue a plain text response
    pub fn push_text(&self, content: impl Into<String>) {
        self.push_response(ToolCompletionResponse::text(content, "scripted"));
    }

    /// Requests observed so far, for assertions
    #[must_use]
    pub fn recorded_requests(&self) -> Vec<ToolCompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn pop(&self) -> Result<ToolCompletionResponse> {
        self.responses
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front()
            .ok_or_else(|| Error::Api("scripted client has no more responses".to_string()))
    }
}

#[async_trait::async_trait]
impl ChatClient for ScriptedClient {
    fn name(&self) -> &str {
        "scripted"
    }

    fn supports_tools(&self) -> bool {
        true
    }

    fn default_model(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(ToolCompletionRequest::new(request, Vec::new()));
        let response = self.pop()?;
        Ok(CompletionResponse {
            content: response.content.unwrap_or_default(),
            usage: response.usage,
            finish_reason: response.finish_reason,
            model: response.model,
        })
    }

    async fn complete_with_tools(
        &self,
        request: ToolCompletionRequest,
    ) -> Result<ToolCompletionResponse> {
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(request);
        self.pop()
    }
}
