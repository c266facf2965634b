//! In-memory knowledge base tool provider

use crate::error::{Error, Result};
use crate::provider::ToolProvider;
use crate::tool::{ToolDescriptor, ToolOutcome, ToolRequest};
use serde::Deserialize;
use tracing::debug;

/// Tool name exposed by the knowledge base
pub const TOOL_NAME: &str = "knowledge-base";

#[derive(Debug, Clone)]
struct Fact {
    // normalized keywords that must all appear in the question
    keywords: Vec<String>,
    answer: String,
}

/// A seeded lookup table exposed as a single `knowledge-base` tool.
///
/// Matching is keyword based: a fact answers a question when every one of its
/// keywords appears in the normalized question text. Questions that match no
/// fact produce [`ToolOutcome::NoMatch`] rather than an error.
#[derive(Debug, Default)]
pub struct KnowledgeBase {
    facts: Vec<Fact>,
}

/// Lowercase, keep alphanumerics plus `+`, collapse whitespace.
///
/// Keeps `+` so arithmetic questions like "2 + 2" survive normalization.
fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_space = true;
    for ch in text.chars() {
        if ch.is_alphanumeric() || ch == '+' {
            for lower in ch.to_lowercase() {
                out.push(lower);
            }
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

#[derive(Deserialize)]
struct QuestionArgs {
    question: String,
}

impl KnowledgeBase {
    /// Create an empty knowledge base
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with the demo facts used by the workshop scenarios
    #[must_use]
    pub fn with_demo_facts() -> Self {
        let mut kb = Self::new();
        kb.add_fact(&["capital", "france"], "Paris is the capital of France.");
        kb.add_fact(&["2 + 2"], "2 + 2 = 4");
        kb.add_fact(&["capital", "japan"], "Tokyo is the capital of Japan.");
        kb
    }

    /// Add a fact keyed by keywords that must all appear in a question
    pub fn add_fact(&mut self, keywords: &[&str], answer: impl Into<String>) {
        self.facts.push(Fact {
            keywords: keywords.iter().map(|k| normalize(k)).collect(),
            answer: answer.into(),
        });
    }

    /// Look up a question, returning the first matching fact's answer
    #[must_use]
    pub fn lookup(&self, question: &str) -> Option<&str> {
        let normalized = normalize(question);
        self.facts
            .iter()
            .find(|fact| fact.keywords.iter().all(|k| normalized.contains(k.as_str())))
            .map(|fact| fact.answer.as_str())
    }
}

#[async_trait::async_trait]
impl ToolProvider for KnowledgeBase {
    fn name(&self) -> &str {
        "knowledge-base"
    }

    fn tools(&self) -> Vec<ToolDescriptor> {
        vec![ToolDescriptor::new(
            TOOL_NAME,
            "Look up an answer to a factual question in the knowledge base",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "question": {
                        "type": "string",
                        "description": "The question to look up"
                    }
                },
                "required": ["question"]
            }),
        )]
    }

    async fn call(&self, request: ToolRequest) -> Result<ToolOutcome> {
        if request.name != TOOL_NAME {
            return Err(Error::UnknownTool(request.name));
        }
        let args: QuestionArgs =
            serde_json::from_value(request.arguments).map_err(|e| Error::InvalidArguments {
                tool: TOOL_NAME.to_string(),
                reason: e.to_string(),
            })?;

        match self.lookup(&args.question) {
            Some(answer) => Ok(ToolOutcome::answer(answer)),
            None => {
                debug!(question = %args.question, "No knowledge base match");
                Ok(ToolOutcome::NoMatch)
            }
        }
    }
}
