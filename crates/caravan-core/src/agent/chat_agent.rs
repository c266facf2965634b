//! The tool-calling agent loop

use super::types::{AgentConfig, AgentRunResult, AgentThread, ToolCallRecord};
use crate::approval::{ApprovalManager, ApprovalStatus};
use crate::error::{Error, Result};
use crate::event_bus::{AgentEvent, EventBus};
use caravan_llm::{ChatClient, CompletionRequest, Message, ToolCompletionRequest};
use caravan_mcp::{ProviderRegistry, ToolOutcome, ToolRequest};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// An agent that answers questions by calling tools through a registry.
///
/// The run loop alternates model completions with tool execution until the
/// model stops requesting tools or the round limit is hit. Tool calls against
/// approval-gated tools block on a human decision first.
pub struct ChatAgent {
    name: String,
    instructions: String,
    client: Arc<dyn ChatClient>,
    registry: Arc<ProviderRegistry>,
    config: AgentConfig,
    event_bus: Option<EventBus>,
    approvals: Option<Arc<ApprovalManager>>,
    allowed_tools: Option<Vec<String>>,
}

impl ChatAgent {
    /// Create a new agent
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        instructions: impl Into<String>,
        client: Arc<dyn ChatClient>,
        registry: Arc<ProviderRegistry>,
    ) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            client,
            registry,
            config: AgentConfig::default(),
            event_bus: None,
            approvals: None,
            allowed_tools: None,
        }
    }

    /// Override the default configuration
    #[must_use]
    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    /// Publish run events to a bus
    #[must_use]
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Gate approval-required tools through a manager
    #[must_use]
    pub fn with_approvals(mut self, approvals: Arc<ApprovalManager>) -> Self {
        self.approvals = Some(approvals);
        self
    }

    /// Advertise only the named tools to the model
    #[must_use]
    pub fn with_allowed_tools(mut self, tools: Vec<String>) -> Self {
        self.allowed_tools = Some(tools);
        self
    }

    /// Agent name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn publish(&self, event: AgentEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }

    fn model(&self) -> String {
        self.config
            .model
            .clone()
            .unwrap_or_else(|| self.client.default_model().to_string())
    }

    /// Answer a question on a fresh thread
    pub async fn run(&self, question: &str) -> Result<AgentRunResult> {
        let mut thread = AgentThread::with_instructions(&self.instructions);
        self.run_on_thread(&mut thread, question).await
    }

    /// Answer a question, appending to an existing thread
    #[instrument(skip(self, thread, question), fields(agent = %self.name))]
    pub async fn run_on_thread(
        &self,
        thread: &mut AgentThread,
        question: &str,
    ) -> Result<AgentRunResult> {
        let run_id = Uuid::new_v4();
        self.publish(AgentEvent::RunStarted {
            run_id,
            agent: self.name.clone(),
        });

        let result = self.run_inner(run_id, thread, question).await;
        match &result {
            Ok(run) => {
                info!(%run_id, rounds = run.rounds, tool_calls = run.tool_calls.len(), "Run completed");
                self.publish(AgentEvent::RunCompleted { run_id });
            }
            Err(e) => {
                warn!(%run_id, error = %e, "Run failed");
                self.publish(AgentEvent::RunFailed {
                    run_id,
                    error: e.to_string(),
                });
            }
        }
        result
    }

    async fn run_inner(
        &self,
        run_id: Uuid,
        thread: &mut AgentThread,
        question: &str,
    ) -> Result<AgentRunResult> {
        thread.push(Message::user(question));

        let mut tools = self.registry.to_llm_tools();
        if let Some(allowed) = &self.allowed_tools {
            tools.retain(|t| allowed.contains(&t.name));
        }
        let mut records: Vec<ToolCallRecord> = Vec::new();
        let mut rounds = 0;

        loop {
            if rounds >= self.config.max_rounds {
                return Err(Error::TooManyRounds {
                    agent: self.name.clone(),
                    max_rounds: self.config.max_rounds,
                });
            }
            rounds += 1;

            let mut request = CompletionRequest::new(self.model())
                .with_messages(thread.messages.clone());
            if let Some(max_tokens) = self.config.max_tokens {
                request = request.with_max_tokens(max_tokens);
            }
            if let Some(temperature) = self.config.temperature {
                request = request.with_temperature(temperature);
            }

            let response = self
                .client
                .complete_with_tools(ToolCompletionRequest::new(request, tools.clone()))
                .await?;

            if !response.has_tool_calls() {
                let mut reply = response.content.unwrap_or_default();
                let sources = Self::sources_of(&records);
                if !sources.is_empty() {
                    reply.push_str(&format!("\n\nSource: {}", sources.join(", ")));
                }
                return Ok(AgentRunResult {
                    run_id,
                    agent: self.name.clone(),
                    reply,
                    tool_calls: records,
                    rounds,
                });
            }

            thread.push(Message::assistant_with_tool_calls(
                response.content.clone().unwrap_or_default(),
                response.tool_calls.clone(),
            ));

            let mut round_matched = false;
            for call in &response.tool_calls {
                let arguments = call.arguments_value()?;
                self.check_approval(run_id, &call.name, &arguments).await?;

                self.publish(AgentEvent::ToolStarted {
                    run_id,
                    tool_name: call.name.clone(),
                    tool_call_id: call.id.clone(),
                });

                let provider = self
                    .registry
                    .provider_for(&call.name)
                    .unwrap_or("unknown")
                    .to_string();
                let started = Instant::now();
                let outcome = self
                    .registry
                    .dispatch(ToolRequest::new(
                        call.id.clone(),
                        call.name.clone(),
                        arguments.clone(),
                    ))
                    .await?;
                let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

                let matched = outcome.is_answer();
                round_matched |= matched;
                self.publish(AgentEvent::ToolCompleted {
                    run_id,
                    tool_call_id: call.id.clone(),
                    matched,
                    duration_ms,
                });
                records.push(ToolCallRecord {
                    tool_call_id: call.id.clone(),
                    tool_name: call.name.clone(),
                    provider,
                    arguments,
                    matched,
                    duration_ms,
                });

                let content = match outcome {
                    ToolOutcome::Answer { text, .. } => text,
                    ToolOutcome::NoMatch => "NO_MATCH".to_string(),
                };
                thread.push(Message::tool_response_named(
                    call.id.clone(),
                    call.name.clone(),
                    content,
                ));
            }

            // Nothing matched anywhere in the run: answer honestly instead of
            // letting the model improvise.
            if !round_matched && records.iter().all(|r| !r.matched) {
                debug!(%run_id, "All tool lookups empty, returning no-answer reply");
                let reply = self.config.no_match_reply.clone();
                thread.push(Message::assistant(reply.clone()));
                return Ok(AgentRunResult {
                    run_id,
                    agent: self.name.clone(),
                    reply,
                    tool_calls: records,
                    rounds,
                });
            }
        }
    }

    async fn check_approval(
        &self,
        run_id: Uuid,
        tool_name: &str,
        arguments: &serde_json::Value,
    ) -> Result<()> {
        let requires_approval = self
            .registry
            .descriptor(tool_name)
            .is_some_and(|d| d.requires_approval);
        if !requires_approval {
            return Ok(());
        }
        let Some(approvals) = &self.approvals else {
            return Err(Error::ApprovalDenied(format!(
                "{tool_name} requires approval but no approval manager is configured"
            )));
        };

        let (request, rx) = approvals
            .create_request(run_id, tool_name, arguments.clone(), self.event_bus.as_ref())
            .await;
        info!(%run_id, tool = tool_name, request_id = %request.id, "Waiting for approval");

        let timeout = Duration::from_secs(self.config.approval_timeout_secs);
        match ApprovalManager::wait(rx, timeout).await {
            ApprovalStatus::Approved => Ok(()),
            _ => Err(Error::ApprovalDenied(tool_name.to_string())),
        }
    }

    fn sources_of(records: &[ToolCallRecord]) -> Vec<&str> {
        let mut sources = Vec::new();
        for record in records {
            if record.matched && !sources.contains(&record.provider.as_str()) {
                sources.push(record.provider.as_str());
            }
        }
        sources
    }
}
