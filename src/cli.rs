//! CLI commands for caravan
//!
//! - `serve`: run the knowledge-base MCP server over SSE
//! - `ask`: answer one question with a tool-calling agent
//! - `plan`: assemble a constrained activity plan with the moderator

use anyhow::{Context, Result};
use caravan_core::{
    AgentConfig, ChatAgent, ChatSpecialist, Constraint, ConstraintSet, EventBus, Moderator,
    Settings,
};
use caravan_llm::{ChatClient, OpenAiChatClient};
use caravan_mcp::{KnowledgeBase, McpServerState, ProviderRegistry, SseProviderClient};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;

/// Caravan multi-agent workshop
#[derive(Parser, Debug)]
#[command(name = "caravan")]
#[command(about = "Multi-agent orchestration workshop")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the knowledge-base MCP server
    Serve {
        /// Port to listen on (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Ask the assistant a question
    Ask {
        /// The question
        question: String,
        /// Use a remote MCP server instead of the in-process knowledge base
        #[arg(long)]
        mcp_url: Option<String>,
        /// Model override
        #[arg(long)]
        model: Option<String>,
    },
    /// Plan activities under constraints
    Plan {
        /// The planning goal, e.g. "a weekend in Lisbon"
        goal: String,
        /// Budget ceiling for the whole plan
        #[arg(long)]
        budget: Option<f64>,
        /// Regions activities must stay within (repeatable)
        #[arg(long = "region")]
        regions: Vec<String>,
        /// Regions to avoid (repeatable)
        #[arg(long = "exclude-region")]
        excluded: Vec<String>,
        /// Require distinct categories, covering at least this many
        #[arg(long)]
        min_categories: Option<usize>,
        /// Model override
        #[arg(long)]
        model: Option<String>,
    },
}

/// Run the parsed CLI command
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Commands::Serve { port }) => serve(port).await,
        Some(Commands::Ask {
            question,
            mcp_url,
            model,
        }) => ask(&question, mcp_url.as_deref(), model).await,
        Some(Commands::Plan {
            goal,
            budget,
            regions,
            excluded,
            min_categories,
            model,
        }) => plan(&goal, budget, regions, excluded, min_categories, model).await,
        None => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            cmd.print_help()?;
            println!();
            Ok(())
        }
    }
}

async fn serve(port: Option<u16>) -> Result<()> {
    let settings = Settings::load()?;
    let port = port.unwrap_or(settings.server.port);

    let mut registry = ProviderRegistry::new();
    registry
        .register(Arc::new(KnowledgeBase::with_demo_facts()))
        .context("failed to register knowledge base")?;

    let state = McpServerState::new("caravan-kb", registry);
    caravan_mcp::serve(state, port).await?;
    Ok(())
}

fn chat_client(model: Option<String>) -> Result<Arc<dyn ChatClient>> {
    let mut config = caravan_llm::OpenAiConfig::from_env()
        .context("set GITHUB_TOKEN or AZURE_OPENAI_API_KEY/AZURE_OPENAI_ENDPOINT")?;
    if let Some(model) = model {
        config = config.with_model(model);
    }
    Ok(Arc::new(OpenAiChatClient::new(config)?))
}

async fn ask(question: &str, mcp_url: Option<&str>, model: Option<String>) -> Result<()> {
    let settings = Settings::load()?;
    let client = chat_client(model.or(settings.agent.model))?;

    let mut registry = ProviderRegistry::new();
    match mcp_url {
        Some(url) => {
            let provider = SseProviderClient::connect(url)
                .await
                .with_context(|| format!("failed to connect to MCP server at {url}"))?;
            registry.register(Arc::new(provider))?;
        }
        None => {
            registry.register(Arc::new(KnowledgeBase::with_demo_facts()))?;
        }
    }

    let config = AgentConfig {
        max_rounds: settings.agent.max_rounds,
        ..AgentConfig::default()
    };
    let agent = ChatAgent::new(
        "assistant",
        "You answer factual questions. Always look answers up with the available \
         tools before replying, and reply with just the answer.",
        client,
        Arc::new(registry),
    )
    .with_config(config)
    .with_event_bus(EventBus::default());

    let result = agent.run(question).await?;
    for record in &result.tool_calls {
        info!(
            tool = %record.tool_name,
            provider = %record.provider,
            matched = record.matched,
            "Tool call"
        );
    }
    println!("{}", result.reply);
    Ok(())
}

async fn plan(
    goal: &str,
    budget: Option<f64>,
    regions: Vec<String>,
    excluded: Vec<String>,
    min_categories: Option<usize>,
    model: Option<String>,
) -> Result<()> {
    let settings = Settings::load()?;
    let client = chat_client(model.or(settings.agent.model))?;

    let mut constraints = ConstraintSet::new();
    if let Some(amount) = budget {
        constraints = constraints.with(Constraint::MaxBudget { amount });
    }
    if !regions.is_empty() {
        constraints = constraints.with(Constraint::AllowedRegions { regions });
    }
    if !excluded.is_empty() {
        constraints = constraints.with(Constraint::ExcludedRegions { regions: excluded });
    }
    if let Some(min_categories) = min_categories {
        constraints = constraints.with(Constraint::ActivityDiversity { min_categories });
    }

    let shared_instructions = format!(
        "You help plan activities for: {goal}\nConstraints:\n{}",
        constraints.describe()
    );
    let specialists: Vec<Arc<dyn caravan_core::Specialist>> = vec![
        Arc::new(ChatSpecialist::new(
            "chef",
            "dining",
            format!("{shared_instructions}\nYou recommend places to eat."),
            Arc::clone(&client),
        )),
        Arc::new(ChatSpecialist::new(
            "guide",
            "sightseeing",
            format!("{shared_instructions}\nYou recommend sights and museums."),
            Arc::clone(&client),
        )),
        Arc::new(ChatSpecialist::new(
            "scout",
            "outdoors",
            format!("{shared_instructions}\nYou recommend outdoor activities."),
            Arc::clone(&client),
        )),
    ];

    let moderator =
        Moderator::new(specialists, constraints).with_event_bus(EventBus::default());
    let outcome = moderator.run(goal).await?;
    println!("{}", outcome.summary);
    Ok(())
}
