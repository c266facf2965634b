//! Agents run one after another, handing results forward

use super::StepRecord;
use crate::agent::ChatAgent;
use crate::error::Result;
use crate::state::SharedState;
use std::sync::Arc;
use tracing::{info, instrument};

/// Runs agents in order; each sees what earlier agents wrote.
///
/// Every step's reply lands in shared state under the agent's name, and the
/// next agent's prompt carries the accumulated context block.
pub struct SequentialWorkflow {
    agents: Vec<Arc<ChatAgent>>,
    state: SharedState,
}

impl SequentialWorkflow {
    /// Create a workflow over the given agents
    #[must_use]
    pub fn new(agents: Vec<Arc<ChatAgent>>) -> Self {
        Self {
            agents,
            state: SharedState::new(),
        }
    }

    /// Use existing shared state instead of a fresh one
    #[must_use]
    pub fn with_state(mut self, state: SharedState) -> Self {
        self.state = state;
        self
    }

    /// The shared state the workflow writes to
    #[must_use]
    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// Run every agent in order against the task
    #[instrument(skip(self, task), fields(steps = self.agents.len()))]
    pub async fn run(&self, task: &str) -> Result<Vec<StepRecord>> {
        let mut records = Vec::with_capacity(self.agents.len());

        for agent in &self.agents {
            let context = self.state.to_context_block().await;
            let prompt = if context.is_empty() {
                task.to_string()
            } else {
                format!("{task}\n\nContext from earlier steps:\n{context}")
            };

            let result = agent.run(&prompt).await?;
            info!(agent = agent.name(), tool_calls = result.tool_calls.len(), "Step complete");

            self.state
                .set(agent.name().to_string(), serde_json::json!(result.reply))
                .await;
            records.push(StepRecord {
                agent: agent.name().to_string(),
                reply: result.reply,
                tool_calls: result.tool_calls.len(),
            });
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caravan_llm::ScriptedClient;
    use caravan_mcp::{KnowledgeBase, ProviderRegistry};

    fn agent(name: &str, client: ScriptedClient) -> Arc<ChatAgent> {
        let mut registry = ProviderRegistry::new();
        registry
            .register(Arc::new(KnowledgeBase::with_demo_facts()))
            .unwrap();
        Arc::new(ChatAgent::new(
            name,
            "Answer briefly.",
            Arc::new(client),
            Arc::new(registry),
        ))
    }

    #[tokio::test]
    async fn test_steps_share_state() {
        let first = ScriptedClient::new();
        first.push_text("The destination is Lisbon.");
        let second = ScriptedClient::new();
        second.push_text("Pack light clothes for Lisbon.");

        let workflow = SequentialWorkflow::new(vec![
            agent("researcher", first),
            agent("packer", second.clone()),
        ]);
        let records = workflow.run("Plan a trip").await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].agent, "researcher");

        // The second agent's prompt included the first agent's reply.
        let requests = second.recorded_requests();
        let prompt = &requests[0].request.messages.last().unwrap().content;
        assert!(prompt.contains("The destination is Lisbon."));

        let stored = workflow.state().get_str("packer").await.unwrap();
        assert!(stored.contains("Pack light"));
    }
}
