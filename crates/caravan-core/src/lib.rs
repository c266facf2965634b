//! Core orchestration for caravan
//!
//! Builds on `caravan-llm` (chat backends) and `caravan-mcp` (tool providers)
//! to provide tool-calling agents, a constraint-enforcing moderator, and
//! sequential/concurrent workflows over shared state.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod agent;
pub mod approval;
pub mod config;
pub mod declarative;
pub mod error;
pub mod event_bus;
pub mod moderator;
pub mod state;
pub mod workflow;

pub use agent::{AgentConfig, AgentRunResult, AgentThread, ChatAgent, ToolCallRecord};
pub use approval::{ApprovalManager, ApprovalRequest, ApprovalStatus};
pub use config::Settings;
pub use declarative::{AgentFactory, AgentSpec};
pub use error::{Error, Result};
pub use event_bus::{AgentEvent, EventBus};
pub use moderator::{
    ChatSpecialist, Constraint, ConstraintSet, Moderator, ModeratorOutcome, Plan, Proposal,
    RejectedProposal, Specialist, Violation,
};
pub use state::SharedState;
pub use workflow::{ConcurrentWorkflow, SequentialWorkflow, StepRecord};
