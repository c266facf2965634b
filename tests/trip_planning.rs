//! Moderated planning scenarios with model-backed specialists

use caravan_core::{
    ChatSpecialist, Constraint, ConstraintSet, Moderator, Specialist,
};
use caravan_llm::ScriptedClient;
use std::sync::Arc;

fn proposal_json(category: &str, title: &str, cost: f64, region: &str) -> String {
    serde_json::json!({
        "category": category,
        "title": title,
        "description": format!("{title} in {region}"),
        "cost": cost,
        "region": region,
    })
    .to_string()
}

fn specialist(name: &str, category: &str, replies: &[String]) -> Arc<dyn Specialist> {
    let client = ScriptedClient::new();
    for reply in replies {
        client.push_text(reply.clone());
    }
    Arc::new(ChatSpecialist::new(
        name,
        category,
        "You propose activities.",
        Arc::new(client),
    ))
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
async fn plan_respects_budget_and_regions() {
    let moderator = Moderator::new(
        vec![
            specialist(
                "chef",
                "dining",
                &[proposal_json("dining", "Seafood dinner", 80.0, "Alfama")],
            ),
            specialist(
                "guide",
                "sightseeing",
                &[proposal_json("sightseeing", "Tile museum", 20.0, "Belem")],
            ),
        ],
        constraints(),
    );

    let outcome = moderator.run("a weekend in Lisbon").await.unwrap();
    assert_eq!(outcome.plan.items.len(), 2);
    assert_eq!(outcome.rounds, 2);
    assert!(outcome.plan.total_cost() <= 200.0);
    assert!(outcome.rejected.is_empty());
    assert!(outcome.summary.contains("Seafood dinner"));
}

#[tokio::test]
async fn out_of_region_proposal_is_revised_once() {
    let moderator = Moderator::new(
        vec![specialist(
            "chef",
            "dining",
            &[
                proposal_json("dining", "Porto feast", 80.0, "Porto"),
                proposal_json("dining", "Alfama dinner", 80.0, "Alfama"),
            ],
        )],
        constraints(),
    );

    let outcome = moderator.run("a weekend in Lisbon").await.unwrap();
    assert_eq!(outcome.plan.items.len(), 1);
    assert_eq!(outcome.plan.items[0].title, "Alfama dinner");
    assert!(outcome.rejected.is_empty());
}

#[tokio::test]
async fn stubborn_specialist_gets_dropped() {
    let moderator = Moderator::new(
        vec![
            specialist(
                "chef",
                "dining",
                &[
                    proposal_json("dining", "Golden banquet", 500.0, "Alfama"),
                    proposal_json("dining", "Silver banquet", 400.0, "Alfama"),
                ],
            ),
            specialist(
                "guide",
                "sightseeing",
                &[proposal_json("sightseeing", "Tile museum", 20.0, "Belem")],
            ),
        ],
        constraints(),
    );

    let outcome = moderator.run("a weekend in Lisbon").await.unwrap();
    // The over-budget dining proposals are gone, sightseeing survives.
    assert_eq!(outcome.plan.items.len(), 1);
    assert_eq!(outcome.plan.items[0].category, "sightseeing");
    assert_eq!(outcome.rejected.len(), 1);
    assert_eq!(outcome.rejected[0].specialist, "chef");
    assert_eq!(outcome.rounds, 2);
}

#[tokio::test]
async fn plan_must_reach_the_requested_category_count() {
    let constraints = ConstraintSet::new()
        .with(Constraint::MaxBudget { amount: 200.0 })
        .with(Constraint::ActivityDiversity { min_categories: 2 });
    let moderator = Moderator::new(
        vec![specialist(
            "chef",
            "dining",
            &[proposal_json("dining", "Seafood dinner", 80.0, "Alfama")],
        )],
        constraints,
    );

    let err = moderator.run("a weekend in Lisbon").await.unwrap_err();
    assert!(err.to_string().contains("2 required"));
}

#[tokio::test]
async fn diversity_blocks_repeat_categories() {
    let moderator = Moderator::new(
        vec![
            specialist(
                "chef",
                "dining",
                &[proposal_json("dining", "Seafood dinner", 50.0, "Alfama")],
            ),
            // Proposes into an already-covered category, then corrects.
            specialist(
                "late-chef",
                "brunch",
                &[
                    proposal_json("dining", "Second dinner", 30.0, "Alfama"),
                    proposal_json("brunch", "Pastry brunch", 25.0, "Belem"),
                ],
            ),
        ],
        constraints(),
    );

    let outcome = moderator.run("a weekend in Lisbon").await.unwrap();
    assert_eq!(outcome.plan.items.len(), 2);
    assert_eq!(outcome.plan.items[1].category, "brunch");
    let categories = outcome.plan.categories();
    let mut deduped = categories.clone();
    deduped.dedup();
    assert_eq!(categories, deduped);
}
