//! Constraint-enforcing moderation of specialist agents

mod constraint;
#[allow(clippy::module_inception)]
mod moderator;
mod plan;
mod specialist;
mod types;

pub use constraint::{Constraint, ConstraintSet};
pub use moderator::{Moderator, DEFAULT_MAX_ROUNDS};
pub use plan::Plan;
pub use specialist::{ChatSpecialist, Specialist};
pub use types::{ModeratorOutcome, Proposal, RejectedProposal, Violation};
