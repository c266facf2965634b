//! Plan constraints

use super::plan::Plan;
use super::types::{Proposal, Violation};
use serde::{Deserialize, Serialize};

/// A single constraint the moderator enforces
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Constraint {
    /// Total plan cost must stay at or under this amount
    MaxBudget {
        /// The budget ceiling
        amount: f64,
    },
    /// Proposals must name one of these regions
    AllowedRegions {
        /// Permitted regions
        regions: Vec<String>,
    },
    /// Proposals must avoid these regions
    ExcludedRegions {
        /// Forbidden regions
        regions: Vec<String>,
    },
    /// No two plan items may share an activity category, and the finished
    /// plan must cover at least `min_categories` distinct categories
    ActivityDiversity {
        /// Minimum number of distinct categories the plan must cover
        min_categories: usize,
    },
}

/// The set of constraints applied to a moderation run.
///
/// Budget and region checks run per candidate, before acceptance. Diversity
/// is verified again over the finished plan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConstraintSet {
    constraints: Vec<Constraint>,
}

fn region_in(list: &[String], region: &str) -> bool {
    list.iter().any(|r| r.eq_ignore_ascii_case(region))
}

impl ConstraintSet {
    /// Create an empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a constraint
    #[must_use]
    pub fn with(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// The constraints in evaluation order
    #[must_use]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Describe the constraints for specialist prompts
    #[must_use]
    pub fn describe(&self) -> String {
        let mut lines = Vec::new();
        for constraint in &self.constraints {
            match constraint {
                Constraint::MaxBudget { amount } => {
                    lines.push(format!("Total cost must not exceed {amount:.2}."));
                }
                Constraint::AllowedRegions { regions } => {
                    lines.push(format!("Stay within these regions: {}.", regions.join(", ")));
                }
                Constraint::ExcludedRegions { regions } => {
                    lines.push(format!("Avoid these regions: {}.", regions.join(", ")));
                }
                Constraint::ActivityDiversity { min_categories } => {
                    lines.push(format!(
                        "Each activity must have a distinct category, covering at \
                         least {min_categories} categories overall."
                    ));
                }
            }
        }
        lines.join("\n")
    }

    /// Check a candidate proposal against the plan built so far
    #[must_use]
    pub fn check_candidate(&self, proposal: &Proposal, plan: &Plan) -> Vec<Violation> {
        let mut violations = Vec::new();
        for constraint in &self.constraints {
            match constraint {
                Constraint::MaxBudget { amount } => {
                    let remaining = amount - plan.total_cost();
                    if proposal.cost > remaining {
                        violations.push(Violation::BudgetExceeded {
                            cost: proposal.cost,
                            remaining,
                        });
                    }
                }
                Constraint::AllowedRegions { regions } => {
                    if let Some(region) = &proposal.region {
                        if !region_in(regions, region) {
                            violations.push(Violation::RegionNotAllowed {
                                region: region.clone(),
                            });
                        }
                    }
                }
                Constraint::ExcludedRegions { regions } => {
                    if let Some(region) = &proposal.region {
                        if region_in(regions, region) {
                            violations.push(Violation::RegionExcluded {
                                region: region.clone(),
                            });
                        }
                    }
                }
                Constraint::ActivityDiversity { .. } => {
                    if plan.covers(&proposal.category) {
                        violations.push(Violation::DuplicateCategory {
                            category: proposal.category.clone(),
                        });
                    }
                }
            }
        }
        violations
    }

    /// Verify the finished plan
    #[must_use]
    pub fn check_final(&self, plan: &Plan) -> Vec<Violation> {
        let mut violations = Vec::new();
        for constraint in &self.constraints {
            match constraint {
                Constraint::MaxBudget { amount } => {
                    if plan.total_cost() > *amount {
                        violations.push(Violation::BudgetExceeded {
                            cost: plan.total_cost(),
                            remaining: *amount,
                        });
                    }
                }
                Constraint::ActivityDiversity { min_categories } => {
                    let mut seen: Vec<String> = Vec::new();
                    for item in &plan.items {
                        let lower = item.category.to_lowercase();
                        if seen.contains(&lower) {
                            violations.push(Violation::DuplicateCategory {
                                category: item.category.clone(),
                            });
                        } else {
                            seen.push(lower);
                        }
                    }
                    if seen.len() < *min_categories {
                        violations.push(Violation::InsufficientDiversity {
                            required: *min_categories,
                            actual: seen.len(),
                        });
                    }
                }
                Constraint::AllowedRegions { .. } | Constraint::ExcludedRegions { .. } => {
                    for item in &plan.items {
                        for violation in self.check_region(item) {
                            if !violations.contains(&violation) {
                                violations.push(violation);
                            }
                        }
                    }
                }
            }
        }
        violations
    }

    fn check_region(&self, proposal: &Proposal) -> Vec<Violation> {
        let mut violations = Vec::new();
        let Some(region) = &proposal.region else {
            return violations;
        };
        for constraint in &self.constraints {
            match constraint {
                Constraint::AllowedRegions { regions } if !region_in(regions, region) => {
                    violations.push(Violation::RegionNotAllowed {
                        region: region.clone(),
                    });
                }
                Constraint::ExcludedRegions { regions } if region_in(regions, region) => {
                    violations.push(Violation::RegionExcluded {
                        region: region.clone(),
                    });
                }
                _ => {}
            }
        }
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposal(category: &str, cost: f64, region: Option<&str>) -> Proposal {
        Proposal {
            specialist: "s".to_string(),
            category: category.to_string(),
            title: "t".to_string(),
            description: "d".to_string(),
            cost,
            region: region.map(String::from),
        }
    }

    #[test]
    fn test_budget_checked_against_remaining() {
        let constraints = ConstraintSet::new().with(Constraint::MaxBudget { amount: 100.0 });
        let mut plan = Plan::new("g");
        plan.items.push(proposal("dining", 70.0, None));

        let violations = constraints.check_candidate(&proposal("museum", 40.0, None), &plan);
        assert_eq!(violations.len(), 1);
        assert!(matches!(violations[0], Violation::BudgetExceeded { .. }));

        let violations = constraints.check_candidate(&proposal("museum", 30.0, None), &plan);
        assert!(violations.is_empty());
    }

    #[test]
    fn test_allowed_regions_case_insensitive() {
        let constraints = ConstraintSet::new().with(Constraint::AllowedRegions {
            regions: vec!["Alfama".to_string(), "Belem".to_string()],
        });
        let plan = Plan::new("g");

        assert!(constraints
            .check_candidate(&proposal("dining", 10.0, Some("alfama")), &plan)
            .is_empty());
        let violations =
            constraints.check_candidate(&proposal("dining", 10.0, Some("Porto")), &plan);
        assert!(matches!(violations[0], Violation::RegionNotAllowed { .. }));
    }

    #[test]
    fn test_excluded_regions() {
        let constraints = ConstraintSet::new().with(Constraint::ExcludedRegions {
            regions: vec!["Porto".to_string()],
        });
        let plan = Plan::new("g");
        let violations =
            constraints.check_candidate(&proposal("dining", 10.0, Some("porto")), &plan);
        assert!(matches!(violations[0], Violation::RegionExcluded { .. }));
    }

    #[test]
    fn test_diversity_candidate_and_final() {
        let constraints =
            ConstraintSet::new().with(Constraint::ActivityDiversity { min_categories: 1 });
        let mut plan = Plan::new("g");
        plan.items.push(proposal("dining", 10.0, None));

        let violations = constraints.check_candidate(&proposal("Dining", 10.0, None), &plan);
        assert!(matches!(violations[0], Violation::DuplicateCategory { .. }));

        plan.items.push(proposal("DINING", 5.0, None));
        let final_violations = constraints.check_final(&plan);
        assert_eq!(final_violations.len(), 1);
    }

    #[test]
    fn test_diversity_minimum_enforced_at_finalization() {
        let constraints =
            ConstraintSet::new().with(Constraint::ActivityDiversity { min_categories: 2 });
        let mut plan = Plan::new("g");
        plan.items.push(proposal("dining", 10.0, None));

        let violations = constraints.check_final(&plan);
        assert_eq!(violations.len(), 1);
        assert!(matches!(
            violations[0],
            Violation::InsufficientDiversity {
                required: 2,
                actual: 1
            }
        ));

        plan.items.push(proposal("museum", 10.0, None));
        assert!(constraints.check_final(&plan).is_empty());
    }
}
