//! Approval manager with oneshot-based resolution

use super::types::{ApprovalError, ApprovalRequest, ApprovalStatus};
use crate::event_bus::{AgentEvent, EventBus};
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::{oneshot, RwLock};
use uuid::Uuid;

/// Tracks pending approval requests and wakes waiters on resolution.
pub struct ApprovalManager {
    requests: RwLock<HashMap<Uuid, ApprovalRequest>>,
    // oneshot senders keyed by request ID, resolvers notify waiters
    resolvers: RwLock<HashMap<Uuid, oneshot::Sender<ApprovalStatus>>>,
    default_timeout_secs: i64,
}

impl Default for ApprovalManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ApprovalManager {
    /// Create a manager with the default 5 minute timeout
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeout_secs(300)
    }

    /// Create with a custom timeout
    #[must_use]
    pub fn with_timeout_secs(timeout_secs: i64) -> Self {
        Self {
            requests: RwLock::new(HashMap::new()),
            resolvers: RwLock::new(HashMap::new()),
            default_timeout_secs: timeout_secs,
        }
    }

    /// Create a request and a receiver that resolves with the decision.
    ///
    /// Publishes [`AgentEvent::ApprovalRequired`] when a bus is given.
    pub async fn create_request(
        &self,
        run_id: Uuid,
        tool_name: impl Into<String>,
        arguments: serde_json::Value,
        event_bus: Option<&EventBus>,
    ) -> (ApprovalRequest, oneshot::Receiver<ApprovalStatus>) {
        let request =
            ApprovalRequest::new(run_id, tool_name, arguments, self.default_timeout_secs);
        let (tx, rx) = oneshot::channel();

        {
            let mut requests = self.requests.write().await;
            requests.insert(request.id, request.clone());
        }
        {
            let mut resolvers = self.resolvers.write().await;
            resolvers.insert(request.id, tx);
        }

        if let Some(bus) = event_bus {
            bus.publish(AgentEvent::ApprovalRequired {
                run_id,
                request_id: request.id,
            });
        }

        (request, rx)
    }

    /// Resolve a request.
    ///
    /// Checks, in order: the request exists, the nonce matches (replay
    /// defense), and the request is still pending.
    pub async fn resolve(
        &self,
        request_id: Uuid,
        nonce: Uuid,
        decision: ApprovalStatus,
        responder_id: &str,
    ) -> std::result::Result<ApprovalRequest, ApprovalError> {
        let mut requests = self.requests.write().await;
        let request = requests
            .get_mut(&request_id)
            .ok_or(ApprovalError::NotFound)?;

        if request.nonce != nonce {
            return Err(ApprovalError::InvalidNonce);
        }
        if !request.is_pending() {
            return Err(ApprovalError::Expired);
        }

        request.status = decision;
        request.responder_id = Some(responder_id.to_string());
        request.responded_at = Some(Utc::now());

        let resolved = request.clone();
        drop(requests);

        let mut resolvers = self.resolvers.write().await;
        if let Some(tx) = resolvers.remove(&request_id) {
            let _ = tx.send(decision);
        }

        Ok(resolved)
    }

    /// Wait for a decision. Timeouts and dropped channels count as rejection.
    pub async fn wait(
        rx: oneshot::Receiver<ApprovalStatus>,
        timeout: std::time::Duration,
    ) -> ApprovalStatus {
        tokio::select! {
            result = rx => result.unwrap_or(ApprovalStatus::Rejected),
            () = tokio::time::sleep(timeout) => ApprovalStatus::Rejected,
        }
    }

    /// Get a request by id
    pub async fn get(&self, id: Uuid) -> Option<ApprovalRequest> {
        let requests = self.requests.read().await;
        requests.get(&id).cloned()
    }

    /// All pending, unexpired requests
    pub async fn pending(&self) -> Vec<ApprovalRequest> {
        let requests = self.requests.read().await;
        requests.values().filter(|r| r.is_pending()).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_approve_wakes_waiter() {
        let manager = ApprovalManager::new();
        let (request, rx) = manager
            .create_request(Uuid::new_v4(), "knowledge-base", serde_json::json!({}), None)
            .await;

        manager
            .resolve(request.id, request.nonce, ApprovalStatus::Approved, "alice")
            .await
            .unwrap();

        let decision =
            ApprovalManager::wait(rx, std::time::Duration::from_secs(1)).await;
        assert_eq!(decision, ApprovalStatus::Approved);
    }

    #[tokio::test]
    async fn test_wrong_nonce_rejected() {
        let manager = ApprovalManager::new();
        let (request, _rx) = manager
            .create_request(Uuid::new_v4(), "tool", serde_json::json!({}), None)
            .await;

        let result = manager
            .resolve(request.id, Uuid::new_v4(), ApprovalStatus::Approved, "alice")
            .await;
        assert_eq!(result.unwrap_err(), ApprovalError::InvalidNonce);

        // Original nonce still works once
        manager
            .resolve(request.id, request.nonce, ApprovalStatus::Approved, "alice")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_double_resolve_fails() {
        let manager = ApprovalManager::new();
        let (request, _rx) = manager
            .create_request(Uuid::new_v4(), "tool", serde_json::json!({}), None)
            .await;

        manager
            .resolve(request.id, request.nonce, ApprovalStatus::Rejected, "alice")
            .await
            .unwrap();
        let result = manager
            .resolve(request.id, request.nonce, ApprovalStatus::Approved, "alice")
            .await;
        assert_eq!(result.unwrap_err(), ApprovalError::Expired);
    }

    #[tokio::test]
    async fn test_timeout_is_rejection() {
        let manager = ApprovalManager::new();
        let (_request, rx) = manager
            .create_request(Uuid::new_v4(), "tool", serde_json::json!({}), None)
            .await;

        let decision =
            ApprovalManager::wait(rx, std::time::Duration::from_millis(10)).await;
        assert_eq!(decision, ApprovalStatus::Rejected);
    }

    #[tokio::test]
    async fn test_event_published() {
        let manager = ApprovalManager::new();
        let bus = EventBus::new(16);
        let mut events = bus.subscribe();

        let run_id = Uuid::new_v4();
        let (request, _rx) = manager
            .create_request(run_id, "tool", serde_json::json!({}), Some(&bus))
            .await;

        match events.recv().await.unwrap() {
            AgentEvent::ApprovalRequired {
                run_id: event_run,
                request_id,
            } => {
                assert_eq!(event_run, run_id);
                assert_eq!(request_id, request.id);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
