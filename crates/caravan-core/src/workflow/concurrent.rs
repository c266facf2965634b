//! Agents run in parallel on the same task

use super::StepRecord;
use crate::agent::ChatAgent;
use crate::error::Result;
use caravan_llm::{ChatClient, CompletionRequest, Message};
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{info, instrument};

/// Fans a task out to several agents at once.
///
/// Results come back in agent order regardless of completion order. An
/// optional summarizer model condenses the replies into one answer.
pub struct ConcurrentWorkflow {
    agents: Vec<Arc<ChatAgent>>,
    summarizer: Option<Arc<dyn ChatClient>>,
}

impl ConcurrentWorkflow {
    /// Create a workflow over the given agents
    #[must_use]
    pub fn new(agents: Vec<Arc<ChatAgent>>) -> Self {
        Self {
            agents,
            summarizer: None,
        }
    }

    /// Summarize the fanned-out replies with a model
    #[must_use]
    pub fn with_summarizer(mut self, client: Arc<dyn ChatClient>) -> Self {
        self.summarizer = Some(client);
        self
    }

    /// Run all agents concurrently; returns per-agent records and an
    /// optional summary
    #[instrument(skip(self, task), fields(agents = self.agents.len()))]
    pub async fn run(&self, task: &str) -> Result<(Vec<StepRecord>, Option<String>)> {
        let runs = self.agents.iter().map(|agent| {
            let agent = Arc::clone(agent);
            let task = task.to_string();
            async move {
                let result = agent.run(&task).await?;
                Ok::<_, crate::error::Error>(StepRecord {
                    agent: agent.name().to_string(),
                    reply: result.reply,
                    tool_calls: result.tool_calls.len(),
                })
            }
        });
        let records = try_join_all(runs).await?;
        info!(agents = records.len(), "Fan-out complete");

        let summary = match &self.summarizer {
            Some(client) => Some(self.summarize(client.as_ref(), task, &records).await?),
            None => None,
        };
        Ok((records, summary))
    }

    async fn summarize(
        &self,
        client: &dyn ChatClient,
        task: &str,
        records: &[StepRecord],
    ) -> Result<String> {
        let mut prompt = format!("Task: {task}\n\nAnswers from the team:\n");
        for record in records {
            prompt.push_str(&format!("- {}: {}\n", record.agent, record.reply));
        }
        prompt.push_str("\nCombine these into one concise answer.");

        let request = CompletionRequest::new(client.default_model())
            .with_message(Message::system("You merge answers from multiple agents."))
            .with_message(Message::user(prompt));
        let response = client.complete(request).await?;
        Ok(response.content)
    }
}
