//! Specialist agents that propose plan items

use super::types::{Proposal, Violation};
use crate::error::{Error, Result};
use crate::state::SharedState;
use caravan_llm::{ChatClient, CompletionRequest, Message};
use std::sync::Arc;
use tracing::debug;

/// A domain expert the moderator consults for one activity category.
#[async_trait::async_trait]
pub trait Specialist: Send + Sync {
    /// Specialist name
    fn name(&self) -> &str;

    /// Activity category this specialist covers
    fn category(&self) -> &str;

    /// Propose a plan item for the goal
    async fn propose(&self, goal: &str, state: &SharedState) -> Result<Proposal>;

    /// Revise a proposal that violated constraints
    async fn revise(
        &self,
        proposal: &Proposal,
        violations: &[Violation],
        state: &SharedState,
    ) -> Result<Proposal>;
}

/// Pull a JSON object out of a model reply.
///
/// Accepts bare JSON, fenced blocks, and prose around the object.
fn extract_json(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        let after = after.strip_prefix("json").unwrap_or(after);
        if let Some(end) = after.find("```") {
            return Some(after[..end].trim());
        }
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    (end > start).then(|| &trimmed[start..=end])
}

/// A [`Specialist`] backed by a chat model.
///
/// Proposals are requested as JSON; replies are parsed leniently so fenced
/// or prose-wrapped objects still work.
pub struct ChatSpecialist {
    name: String,
    category: String,
    instructions: String,
    client: Arc<dyn ChatClient>,
    model: Option<String>,
}

impl ChatSpecialist {
    /// Create a specialist
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        instructions: impl Into<String>,
        client: Arc<dyn ChatClient>,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            instructions: instructions.into(),
            client,
            model: None,
        }
    }

    /// Override the model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    fn system_prompt(&self) -> String {
        format!(
            "{}\n\nYou propose one activity in the category \"{}\".\n\
             Reply with a single JSON object with the fields: \
             category (string), title (string), description (string), \
             cost (number), region (string or null). No other text.",
            self.instructions, self.category
        )
    }

    async fn ask(&self, prompt: String) -> Result<Proposal> {
        let model = self
            .model
            .clone()
            .unwrap_or_else(|| self.client.default_model().to_string());
        let request = CompletionRequest::new(model)
            .with_message(Message::system(self.system_prompt()))
            .with_message(Message::user(prompt));
        let response = self.client.complete(request).await?;

        let json = extract_json(&response.content).ok_or_else(|| Error::InvalidProposal {
            specialist: self.name.clone(),
            reason: "reply contained no JSON object".to_string(),
        })?;
        let mut proposal: Proposal =
            serde_json::from_str(json).map_err(|e| Error::InvalidProposal {
                specialist: self.name.clone(),
                reason: e.to_string(),
            })?;
        proposal.specialist = self.name.clone();
        debug!(specialist = %self.name, title = %proposal.title, "Parsed proposal");
        Ok(proposal)
    }
}

#[async_trait::async_trait]
impl Specialist for ChatSpecialist {
    fn name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> &str {
        &self.category
    }

    async fn propose(&self, goal: &str, state: &SharedState) -> Result<Proposal> {
        let context = state.to_context_block().await;
        let mut prompt = format!("Goal: {goal}\n");
        if !context.is_empty() {
            prompt.push_str(&format!("\nAlready planned:\n{context}"));
        }
        prompt.push_str("\nPropose one activity.");
        self.ask(prompt).await
    }

    async fn revise(
        &self,
        proposal: &Proposal,
        violations: &[Violation],
        state: &SharedState,
    ) -> Result<Proposal> {
        let context = state.to_context_block().await;
        let problems = violations
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n- ");
        let mut prompt = format!(
            "Your proposal \"{}\" (cost {:.2}) was rejected:\n- {problems}\n",
            proposal.title, proposal.cost
        );
        if !context.is_empty() {
            prompt.push_str(&format!("\nAlready planned:\n{context}"));
        }
        prompt.push_str("\nPropose a corrected activity that fixes every problem.");
        self.ask(prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SharedState;
    use caravan_llm::ScriptedClient;

    #[test]
    fn test_extract_json_bare() {
        assert_eq!(extract_json(r#"{"a": 1}"#), Some(r#"{"a": 1}"#));
    }

    #[test]
    fn test_extract_json_fenced() {
        let text = "Here you go:\n```json\n{\"a\": 1}\n```";
        assert_eq!(extract_json(text), Some("{\"a\": 1}"));
    }

    #[test]
    fn test_extract_json_prose_wrapped() {
        let text = "Sure! {\"a\": 1} hope that helps";
        assert_eq!(extract_json(text), Some("{\"a\": 1}"));
    }

    #[test]
    fn test_extract_json_none() {
        assert_eq!(extract_json("no json here"), None);
    }

    #[tokio::test]
    async fn test_propose_parses_reply() {
        let client = ScriptedClient::new();
        client.push_text(
            r#"```json
{"category": "dining", "title": "Seafood dinner", "description": "Harbor dinner", "cost": 80.0, "region": "Alfama"}
```"#,
        );

        let specialist = ChatSpecialist::new(
            "chef",
            "dining",
            "You recommend restaurants.",
            Arc::new(client),
        );
        let proposal = specialist
            .propose("weekend in Lisbon", &SharedState::new())
            .await
            .unwrap();
        assert_eq!(proposal.specialist, "chef");
        assert_eq!(proposal.category, "dining");
        assert!((proposal.cost - 80.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_propose_rejects_garbage() {
        let client = ScriptedClient::new();
        client.push_text("I have no idea.");

        let specialist =
            ChatSpecialist::new("chef", "dining", "instructions", Arc::new(client));
        let result = specialist.propose("goal", &SharedState::new()).await;
        assert!(matches!(result, Err(Error::InvalidProposal { .. })));
    }
}
