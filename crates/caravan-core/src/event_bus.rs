//! Broadcast-based event bus for agent and moderator runs
//!
//! Publishes events during execution so CLI frontends and tests can observe
//! progress without coupling to the run loop.

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Events emitted during agent and moderator execution.
///
/// Events carry names and ids, never full tool outputs or credentials.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// An agent run has started
    RunStarted {
        /// Unique run identifier
        run_id: Uuid,
        /// Agent name
        agent: String,
    },
    /// Tool execution started
    ToolStarted {
        /// Run identifier
        run_id: Uuid,
        /// Name of the tool being executed
        tool_name: String,
        /// Tool call ID from the model
        tool_call_id: String,
    },
    /// Tool execution completed
    ToolCompleted {
        /// Run identifier
        run_id: Uuid,
        /// Tool call ID
        tool_call_id: String,
        /// Whether the tool produced an answer
        matched: bool,
        /// Execution duration in milliseconds
        duration_ms: u64,
    },
    /// A tool call is waiting for human approval
    ApprovalRequired {
        /// Run identifier
        run_id: Uuid,
        /// Approval request ID
        request_id: Uuid,
    },
    /// The run finished successfully
    RunCompleted {
        /// Run identifier
        run_id: Uuid,
    },
    /// The run failed
    RunFailed {
        /// Run identifier
        run_id: Uuid,
        /// Sanitized error description
        error: String,
    },
    /// The moderator accepted a specialist's proposal
    ProposalAccepted {
        /// Run identifier
        run_id: Uuid,
        /// Specialist name
        specialist: String,
        /// Activity category covered by the proposal
        category: String,
    },
    /// A proposal violated constraints and was sent back for revision
    ProposalRevised {
        /// Run identifier
        run_id: Uuid,
        /// Specialist name
        specialist: String,
        /// Violations that triggered the revision
        violations: Vec<String>,
    },
    /// A revised proposal still violated constraints and was dropped
    ProposalRejected {
        /// Run identifier
        run_id: Uuid,
        /// Specialist name
        specialist: String,
    },
}

impl AgentEvent {
    /// Get the run id from any event variant.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        match self {
            Self::RunStarted { run_id, .. }
            | Self::ToolStarted { run_id, .. }
            | Self::ToolCompleted { run_id, .. }
            | Self::ApprovalRequired { run_id, .. }
            | Self::RunCompleted { run_id }
            | Self::RunFailed { run_id, .. }
            | Self::ProposalAccepted { run_id, .. }
            | Self::ProposalRevised { run_id, .. }
            | Self::ProposalRejected { run_id, .. } => *run_id,
        }
    }
}

/// Broadcast-based event bus.
///
/// Uses `tokio::broadcast` so multiple subscribers can receive the same events.
/// Slow subscribers miss events (lagged) rather than blocking the publisher.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<AgentEvent>,
}

impl EventBus {
    /// Create a new bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to all future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all active subscribers.
    ///
    /// Returns the number of subscribers that received it. With no
    /// subscribers the event is silently dropped.
    pub fn publish(&self, event: AgentEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Current number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
