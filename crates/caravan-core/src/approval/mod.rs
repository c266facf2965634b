//! Human-in-the-loop approval for tool calls

mod manager;
mod types;

pub use manager::ApprovalManager;
pub use types::{ApprovalError, ApprovalRequest, ApprovalStatus};
