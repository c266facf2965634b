//! The moderation loop

use super::constraint::ConstraintSet;
use super::plan::Plan;
use super::specialist::Specialist;
use super::types::{ModeratorOutcome, RejectedProposal};
use crate::error::{Error, Result};
use crate::event_bus::{AgentEvent, EventBus};
use crate::state::SharedState;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Default bound on specialist consultations per run
pub const DEFAULT_MAX_ROUNDS: usize = 8;

/// Sequences specialists into a plan while enforcing constraints.
///
/// Moderation runs in rounds. Each round consults the first specialist whose
/// category the plan does not yet cover; proposals are checked against the
/// constraints before acceptance, a violating proposal gets one revision
/// attempt, and a still-violating revision drops the specialist for the rest
/// of the run. The run ends when every specialist category is covered or
/// dropped, or when `max_rounds` consultations have been spent.
pub struct Moderator {
    specialists: Vec<Arc<dyn Specialist>>,
    constraints: ConstraintSet,
    event_bus: Option<EventBus>,
    max_rounds: usize,
}

impl Moderator {
    /// Create a moderator over a set of specialists
    #[must_use]
    pub fn new(specialists: Vec<Arc<dyn Specialist>>, constraints: ConstraintSet) -> Self {
        Self {
            specialists,
            constraints,
            event_bus: None,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    /// Publish moderation events to a bus
    #[must_use]
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Bound the number of specialist consultations per run
    #[must_use]
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    fn publish(&self, event: AgentEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }

    /// Run moderation for a goal on fresh shared state
    pub async fn run(&self, goal: &str) -> Result<ModeratorOutcome> {
        self.run_with_state(goal, &SharedState::new()).await
    }

    /// Run moderation, reading and writing the given shared state
    #[instrument(skip(self, goal, state), fields(specialists = self.specialists.len()))]
    pub async fn run_with_state(
        &self,
        goal: &str,
        state: &SharedState,
    ) -> Result<ModeratorOutcome> {
        let run_id = Uuid::new_v4();
        self.publish(AgentEvent::RunStarted {
            run_id,
            agent: "moderator".to_string(),
        });

        let mut plan = Plan::new(goal);
        let mut rejected = Vec::new();
        let mut dropped: HashSet<String> = HashSet::new();
        let mut rounds = 0;

        // An accepted proposal can land in a category other than the
        // specialist's own, so the same specialist may be consulted again in a
        // later round. max_rounds keeps that bounded.
        while rounds < self.max_rounds {
            let Some(specialist) = self
                .specialists
                .iter()
                .find(|s| !plan.covers(s.category()) && !dropped.contains(s.name()))
            else {
                break;
            };
            rounds += 1;
            debug!(
                round = rounds,
                specialist = specialist.name(),
                category = specialist.category(),
                "Consulting specialist"
            );

            let proposal = specialist.propose(goal, state).await?;
            let violations = self.constraints.check_candidate(&proposal, &plan);

            let accepted = if violations.is_empty() {
                Some(proposal)
            } else {
                self.publish(AgentEvent::ProposalRevised {
                    run_id,
                    specialist: specialist.name().to_string(),
                    violations: violations.iter().map(ToString::to_string).collect(),
                });
                info!(
                    specialist = specialist.name(),
                    violations = violations.len(),
                    "Proposal violates constraints, requesting revision"
                );

                let revised = specialist.revise(&proposal, &violations, state).await?;
                let still_violating = self.constraints.check_candidate(&revised, &plan);
                if still_violating.is_empty() {
                    Some(revised)
                } else {
                    warn!(
                        specialist = specialist.name(),
                        "Revision still violates constraints, dropping proposal"
                    );
                    self.publish(AgentEvent::ProposalRejected {
                        run_id,
                        specialist: specialist.name().to_string(),
                    });
                    rejected.push(RejectedProposal {
                        specialist: specialist.name().to_string(),
                        proposal: revised,
                        violations: still_violating,
                    });
                    dropped.insert(specialist.name().to_string());
                    None
                }
            };

            if let Some(item) = accepted {
                self.publish(AgentEvent::ProposalAccepted {
                    run_id,
                    specialist: specialist.name().to_string(),
                    category: item.category.clone(),
                });
                state
                    .set(
                        format!("plan.{}", item.category.to_lowercase()),
                        serde_json::json!(format!("{} (cost {:.2})", item.title, item.cost)),
                    )
                    .await;
                plan.items.push(item);
            }
        }

        // Re-verify the finished plan. Per-candidate checks keep duplicates
        // and budget busts out, but a diversity minimum can only be judged
        // over the whole plan.
        let final_violations = self.constraints.check_final(&plan);
        if !final_violations.is_empty() {
            self.publish(AgentEvent::RunFailed {
                run_id,
                error: "finished plan violates constraints".to_string(),
            });
            return Err(Error::Planning(format!(
                "finished plan violates constraints: {}",
                final_violations
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ")
            )));
        }

        let mut summary = plan.render();
        for dropped in &rejected {
            summary.push_str(&format!(
                "Dropped {} proposal from {}: {}\n",
                dropped.proposal.category,
                dropped.specialist,
                dropped
                    .violations
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ")
            ));
        }

        self.publish(AgentEvent::RunCompleted { run_id });
        info!(
            items = plan.items.len(),
            rejected = rejected.len(),
            rounds,
            total_cost = plan.total_cost(),
            "Moderation complete"
        );
        Ok(ModeratorOutcome {
            plan,
            rejected,
            rounds,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moderator::constraint::Constraint;
    use crate::moderator::types::{Proposal, Violation};
    use std::sync::Mutex;

    /// A specialist that returns queued proposals without a model.
    struct ScriptedSpecialist {
        name: String,
        category: String,
        proposals: Mutex<Vec<Proposal>>,
    }

    impl ScriptedSpecialist {
        fn new(name: &str, category: &str, proposals: Vec<Proposal>) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                category: category.to_string(),
                proposals: Mutex::new(proposals),
            })
        }
    }

    #[async_trait::async_trait]
    impl Specialist for ScriptedSpecialist {
        fn name(&self) -> &str {
            &self.name
        }
        fn category(&self) -> &str {
            &self.category
        }
        async fn propose(&self, _goal: &str, _state: &SharedState) -> Result<Proposal> {
            Ok(self.proposals.lock().unwrap().remove(0))
        }
        async fn revise(
            &self,
            _proposal: &Proposal,
            _violations: &[Violation],
            _state: &SharedState,
        ) -> Result<Proposal> {
            Ok(self.proposals.lock().unwrap().remove(0))
        }
    }

    fn proposal(category: &str, title: &str, cost: f64, region: Option<&str>) -> Proposal {
        Proposal {
            specialist: String::new(),
            category: category.to_string(),
            title: title.to_string(),
            description: "d".to_string(),
            cost,
            region: region.map(String::from),
        }
    }

    fn constraints() -> ConstraintSet {
        ConstraintSet::new()
            .with(Constraint::MaxBudget { amount: 200.0 })
            .with(Constraint::AllowedRegions {
                regions: vec!["Alfama".to_string(), "Belem".to_string()],
            })
            .with(Constraint::ActivityDiversity { min_categories: 1 })
    }

    #[tokio::test]
    async fn test_clean_proposals_accepted() {
        let moderator = Moderator::new(
            vec![
                ScriptedSpecialist::new(
                    "chef",
                    "dining",
                    vec![proposal("dining", "Seafood dinner", 80.0, Some("Alfama"))],
                ),
                ScriptedSpecialist::new(
                    "guide",
                    "museum",
                    vec![proposal("museum", "Tile museum", 20.0, Some("Belem"))],
                ),
            ],
            constraints(),
        );

        let outcome = moderator.run("weekend in Lisbon").await.unwrap();
        assert_eq!(outcome.plan.items.len(), 2);
        assert!(outcome.rejected.is_empty());
        assert_eq!(outcome.rounds, 2);
        assert!((outcome.plan.total_cost() - 100.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_violating_proposal_revised_and_accepted() {
        let moderator = Moderator::new(
            vec![ScriptedSpecialist::new(
                "chef",
                "dining",
                vec![
                    proposal("dining", "Porto feast", 80.0, Some("Porto")),
                    proposal("dining", "Alfama dinner", 80.0, Some("Alfama")),
                ],
            )],
            constraints(),
        );

        let outcome = moderator.run("goal").await.unwrap();
        assert_eq!(outcome.plan.items.len(), 1);
        assert_eq!(outcome.plan.items[0].title, "Alfama dinner");
    }

    #[tokio::test]
    async fn test_still_violating_revision_dropped() {
        let moderator = Moderator::new(
            vec![ScriptedSpecialist::new(
                "chef",
                "dining",
                vec![
                    proposal("dining", "Too pricey", 500.0, Some("Alfama")),
                    proposal("dining", "Still too pricey", 300.0, Some("Alfama")),
                ],
            )],
            ConstraintSet::new().with(Constraint::MaxBudget { amount: 200.0 }),
        );

        let outcome = moderator.run("goal").await.unwrap();
        assert!(outcome.plan.items.is_empty());
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].specialist, "chef");
        assert_eq!(outcome.rounds, 1);
        assert!(outcome.summary.contains("Dropped"));
    }

    #[tokio::test]
    async fn test_max_rounds_stops_consultations() {
        let moderator = Moderator::new(
            vec![
                ScriptedSpecialist::new(
                    "chef",
                    "dining",
                    vec![proposal("dining", "Dinner", 50.0, Some("Alfama"))],
                ),
                ScriptedSpecialist::new(
                    "guide",
                    "museum",
                    vec![proposal("museum", "Tile museum", 20.0, Some("Belem"))],
                ),
            ],
            constraints(),
        )
        .with_max_rounds(1);

        let outcome = moderator.run("goal").await.unwrap();
        assert_eq!(outcome.rounds, 1);
        assert_eq!(outcome.plan.items.len(), 1);
        assert_eq!(outcome.plan.items[0].category, "dining");
    }

    #[tokio::test]
    async fn test_unmet_diversity_minimum_fails_run() {
        let moderator = Moderator::new(
            vec![ScriptedSpecialist::new(
                "chef",
                "dining",
                vec![proposal("dining", "Dinner", 50.0, Some("Alfama"))],
            )],
            ConstraintSet::new().with(Constraint::ActivityDiversity { min_categories: 2 }),
        );

        let err = moderator.run("goal").await.unwrap_err();
        assert!(err.to_string().contains("2 required"));
    }

    #[tokio::test]
    async fn test_budget_tracked_across_specialists() {
        // Second specialist's first proposal busts the remaining budget.
        let moderator = Moderator::new(
            vec![
                ScriptedSpecialist::new(
                    "chef",
                    "dining",
                    vec![proposal("dining", "Dinner", 150.0, Some("Alfama"))],
                ),
                ScriptedSpecialist::new(
                    "guide",
                    "museum",
                    vec![
                        proposal("museum", "Private tour", 100.0, Some("Belem")),
                        proposal("museum", "Tile museum", 20.0, Some("Belem")),
                    ],
                ),
            ],
            constraints(),
        );

        let outcome = moderator.run("goal").await.unwrap();
        assert_eq!(outcome.plan.items.len(), 2);
        assert!(outcome.plan.total_cost() <= 200.0);
        assert_eq!(outcome.plan.items[1].title, "Tile museum");
    }

    #[tokio::test]
    async fn test_duplicate_category_specialist_skipped() {
        let moderator = Moderator::new(
            vec![
                ScriptedSpecialist::new(
                    "chef",
                    "dining",
                    vec![proposal("dining", "Dinner", 50.0, Some("Alfama"))],
                ),
                // Same category: must be skipped without being consulted.
                ScriptedSpecialist::new("second-chef", "dining", vec![]),
            ],
            constraints(),
        );

        let outcome = moderator.run("goal").await.unwrap();
        assert_eq!(outcome.plan.items.len(), 1);
    }

    #[tokio::test]
    async fn test_events_emitted() {
        let bus = EventBus::new(32);
        let mut events = bus.subscribe();

        let moderator = Moderator::new(
            vec![ScriptedSpecialist::new(
                "chef",
                "dining",
                vec![
                    proposal("dining", "Porto feast", 80.0, Some("Porto")),
                    proposal("dining", "Alfama dinner", 80.0, Some("Alfama")),
                ],
            )],
            constraints(),
        )
        .with_event_bus(bus);

        moderator.run("goal").await.unwrap();

        let mut saw_revised = false;
        let mut saw_accepted = false;
        while let Ok(event) = events.try_recv() {
            match event {
                AgentEvent::ProposalRevised { violations, .. } => {
                    saw_revised = true;
                    assert!(!violations.is_empty());
                }
                AgentEvent::ProposalAccepted { category, .. } => {
                    saw_accepted = true;
                    assert_eq!(category, "dining");
                }
                _ => {}
            }
        }
        assert!(saw_revised);
        assert!(saw_accepted);
    }

    #[tokio::test]
    async fn test_shared_state_updated() {
        let state = SharedState::new();
        let moderator = Moderator::new(
            vec![ScriptedSpecialist::new(
                "chef",
                "dining",
                vec![proposal("dining", "Dinner", 50.0, Some("Alfama"))],
            )],
            constraints(),
        );

        moderator.run_with_state("goal", &state).await.unwrap();
        let entry = state.get_str("plan.dining").await.unwrap();
        assert!(entry.contains("Dinner"));
    }
}
