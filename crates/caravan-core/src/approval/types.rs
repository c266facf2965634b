//! Approval request types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Decision state of an approval request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    /// Waiting for a decision
    Pending,
    /// Approved by the reviewer
    Approved,
    /// Rejected by the reviewer
    Rejected,
}

/// A pending request for a human to approve a tool call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    /// Unique request id
    pub id: Uuid,
    /// Run that triggered the request
    pub run_id: Uuid,
    /// Tool awaiting approval
    pub tool_name: String,
    /// Arguments the tool would be called with
    pub arguments: serde_json::Value,
    /// Single-use nonce; the response must echo it back
    pub nonce: Uuid,
    /// Current status
    pub status: ApprovalStatus,
    /// When the request was created
    pub created_at: DateTime<Utc>,
    /// When the request expires
    pub expires_at: DateTime<Utc>,
    /// Who responded, if resolved
    pub responder_id: Option<String>,
    /// When the response arrived
    pub responded_at: Option<DateTime<Utc>>,
}

impl ApprovalRequest {
    /// Create a pending request expiring after `timeout_secs`
    #[must_use]
    pub fn new(
        run_id: Uuid,
        tool_name: impl Into<String>,
        arguments: serde_json::Value,
        timeout_secs: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            run_id,
            tool_name: tool_name.into(),
            arguments,
            nonce: Uuid::new_v4(),
            status: ApprovalStatus::Pending,
            created_at: now,
            expires_at: now + Duration::seconds(timeout_secs),
            responder_id: None,
            responded_at: None,
        }
    }

    /// True while the request is undecided and unexpired.
    ///
    /// An expired request counts as rejected.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == ApprovalStatus::Pending && Utc::now() < self.expires_at
    }
}

/// Errors when resolving an approval request
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalError {
    /// No request with that id
    #[error("approval request not found")]
    NotFound,
    /// Nonce mismatch, possible replay
    #[error("invalid nonce")]
    InvalidNonce,
    /// Request already resolved or expired
    #[error("request expired or already resolved")]
    Expired,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_request_is_pending() {
        let request = ApprovalRequest::new(
            Uuid::new_v4(),
            "knowledge-base",
            serde_json::json!({"question": "q"}),
            300,
        );
        assert!(request.is_pending());
        assert_eq!(request.status, ApprovalStatus::Pending);
    }

    #[test]
    fn test_expired_request_not_pending() {
        let request = ApprovalRequest::new(Uuid::new_v4(), "tool", serde_json::json!({}), -1);
        assert!(!request.is_pending());
    }
}
