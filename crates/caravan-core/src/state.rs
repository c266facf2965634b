//! Shared key-value state passed between workflow steps

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Cheaply clonable shared state for multi-agent workflows.
///
/// Agents read what earlier steps wrote and contribute their own entries
/// under well-known keys.
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    inner: Arc<RwLock<HashMap<String, Value>>>,
}

impl SharedState {
    /// Create empty state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value under a key
    pub async fn set(&self, key: impl Into<String>, value: Value) {
        let mut inner = self.inner.write().await;
        inner.insert(key.into(), value);
    }

    /// Get a value by key
    pub async fn get(&self, key: &str) -> Option<Value> {
        let inner = self.inner.read().await;
        inner.get(key).cloned()
    }

    /// Get a string value by key
    pub async fn get_str(&self, key: &str) -> Option<String> {
        self.get(key).await.and_then(|v| match v {
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        })
    }

    /// Snapshot of all entries
    pub async fn snapshot(&self) -> HashMap<String, Value> {
        let inner = self.inner.read().await;
        inner.clone()
    }

    /// Render entries as a context block for prompts.
    ///
    /// Keys are sorted for deterministic output.
    pub async fn to_context_block(&self) -> String {
        let snapshot = self.snapshot().await;
        let mut keys: Vec<_> = snapshot.keys().collect();
        keys.sort();
        let mut block = String::new();
        for key in keys {
            let value = match &snapshot[key] {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            block.push_str(key);
            block.push_str(": ");
            block.push_str(&value);
            block.push('\n');
        }
        block
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get() {
        let state = SharedState::new();
        state.set("destination", serde_json::json!("Lisbon")).await;
        assert_eq!(state.get_str("destination").await.as_deref(), Some("Lisbon"));
        assert!(state.get("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_clones_share_data() {
        let state = SharedState::new();
        let clone = state.clone();
        clone.set("budget", serde_json::json!(1500)).await;
        assert_eq!(state.get("budget").await, Some(serde_json::json!(1500)));
    }

    #[tokio::test]
    async fn test_context_block_sorted() {
        let state = SharedState::new();
        state.set("b", serde_json::json!("two")).await;
        state.set("a", serde_json::json!("one")).await;
        assert_eq!(state.to_context_block().await, "a: one\nb: two\n");
    }
}
