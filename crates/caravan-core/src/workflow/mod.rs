//! Multi-agent workflows over shared state

mod concurrent;
mod sequential;

pub use concurrent::ConcurrentWorkflow;
pub use sequential::SequentialWorkflow;

use serde::{Deserialize, Serialize};

/// One completed workflow step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    /// Agent that ran the step
    pub agent: String,
    /// The agent's reply
    pub reply: String,
    /// Tool calls the step made
    pub tool_calls: usize,
}
