//! Proposals, violations and moderation outcomes

use super::plan::Plan;
use serde::{Deserialize, Serialize};

/// A candidate plan item offered by a specialist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    /// Specialist that produced it
    #[serde(default)]
    pub specialist: String,
    /// Activity category (e.g. "dining", "museum")
    pub category: String,
    /// Short title
    pub title: String,
    /// What the activity involves
    pub description: String,
    /// Estimated cost
    pub cost: f64,
    /// Region the activity takes place in
    #[serde(default)]
    pub region: Option<String>,
}

/// Why a proposal was not acceptable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// The proposal would push the plan over budget
    BudgetExceeded {
        /// Proposal cost
        cost: f64,
        /// Budget left before the proposal
        remaining: f64,
    },
    /// The region is not on the allow list
    RegionNotAllowed {
        /// Offending region
        region: String,
    },
    /// The region is explicitly excluded
    RegionExcluded {
        /// Offending region
        region: String,
    },
    /// The plan already covers this activity category
    DuplicateCategory {
        /// Repeated category
        category: String,
    },
    /// The finished plan covers fewer distinct categories than required
    InsufficientDiversity {
        /// Required number of distinct categories
        required: usize,
        /// Distinct categories actually covered
        actual: usize,
    },
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BudgetExceeded { cost, remaining } => {
                write!(f, "cost {cost:.2} exceeds remaining budget {remaining:.2}")
            }
            Self::RegionNotAllowed { region } => {
                write!(f, "region {region} is not in the allowed regions")
            }
            Self::RegionExcluded { region } => write!(f, "region {region} is excluded"),
            Self::DuplicateCategory { category } => {
                write!(f, "category {category} is already covered")
            }
            Self::InsufficientDiversity { required, actual } => {
                write!(
                    f,
                    "plan covers {actual} distinct categories, {required} required"
                )
            }
        }
    }
}

/// A proposal that was dropped after a failed revision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedProposal {
    /// Specialist whose proposal was dropped
    pub specialist: String,
    /// The final (revised) proposal
    pub proposal: Proposal,
    /// Violations still present after revision
    pub violations: Vec<Violation>,
}

/// Result of a moderation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModeratorOutcome {
    /// The assembled plan
    pub plan: Plan,
    /// Proposals dropped along the way
    pub rejected: Vec<RejectedProposal>,
    /// Specialist consultations the run took
    pub rounds: usize,
    /// Human-readable summary
    pub summary: String,
}
