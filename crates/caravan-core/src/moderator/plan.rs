//! The plan assembled by the moderator

use super::types::Proposal;
use serde::{Deserialize, Serialize};

/// An ordered collection of accepted proposals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// Goal the plan serves
    pub goal: String,
    /// Accepted items in acceptance order
    pub items: Vec<Proposal>,
}

impl Plan {
    /// Create an empty plan for a goal
    #[must_use]
    pub fn new(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            items: Vec::new(),
        }
    }

    /// Sum of item costs
    #[must_use]
    pub fn total_cost(&self) -> f64 {
        self.items.iter().map(|i| i.cost).sum()
    }

    /// Categories covered, in acceptance order
    #[must_use]
    pub fn categories(&self) -> Vec<&str> {
        self.items.iter().map(|i| i.category.as_str()).collect()
    }

    /// True when a category is already covered
    #[must_use]
    pub fn covers(&self, category: &str) -> bool {
        self.items
            .iter()
            .any(|i| i.category.eq_ignore_ascii_case(category))
    }

    /// Render the plan as display text
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = format!("Plan: {}\n", self.goal);
        for (index, item) in self.items.iter().enumerate() {
            out.push_str(&format!(
                "{}. [{}] {} - {} (cost {:.2}{})\n",
                index + 1,
                item.category,
                item.title,
                item.description,
                item.cost,
                item.region
                    .as_deref()
                    .map(|r| format!(", {r}"))
                    .unwrap_or_default(),
            ));
        }
        out.push_str(&format!("Total cost: {:.2}\n", self.total_cost()));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(category: &str, cost: f64) -> Proposal {
        Proposal {
            specialist: "s".to_string(),
            category: category.to_string(),
            title: "t".to_string(),
            description: "d".to_string(),
            cost,
            region: None,
        }
    }

    #[test]
    fn test_total_and_covers() {
        let mut plan = Plan::new("weekend in Lisbon");
        plan.items.push(item("dining", 80.0));
        plan.items.push(item("museum", 20.0));

        assert!((plan.total_cost() - 100.0).abs() < f64::EPSILON);
        assert!(plan.covers("Dining"));
        assert!(!plan.covers("hiking"));
    }

    #[test]
    fn test_render_includes_total() {
        let mut plan = Plan::new("goal");
        plan.items.push(item("dining", 42.5));
        let text = plan.render();
        assert!(text.contains("Total cost: 42.50"));
    }
}
