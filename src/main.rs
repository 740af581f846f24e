// src/main.rs
//
// deckforge - command line front end for the deck engine.
// Every command prints JSON on stdout.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use uuid::Uuid;

use deckforge::application::{CardBodyDto, DeckDto, TierDto, ToErrorResponse};
use deckforge::{AppResult, DeckEngine, EngineConfig, Tier};

#[derive(Parser)]
#[command(name = "deckforge")]
#[command(about = "Tiered learning decks, generated once and kept locally", long_about = None)]
#[command(version)]
struct Cli {
    /// SQLite database file (overrides $DECKFORGE_DATABASE)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Keep everything in memory for this run
    #[arg(long, global = true, conflicts_with = "database")]
    memory: bool,

    /// Base URL of the generation service (overrides $DECKFORGE_GATEWAY_URL)
    #[arg(long, global = true)]
    gateway_url: Option<String>,

    /// Pre-built hierarchy file (overrides $DECKFORGE_HIERARCHY)
    #[arg(long, global = true)]
    hierarchy: Option<PathBuf>,

    /// Do not generate the next tier in the background
    #[arg(long, global = true)]
    no_prefetch: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a deck and the children known for it
    Deck { deck_id: String },

    /// Resolve a deck's children, generating them if needed
    Children { deck_id: String },

    /// Load a tier's cards, generating them if needed
    Tier {
        deck_id: String,
        #[arg(default_value = "core")]
        tier: Tier,
    },

    /// Mark a card as learned
    Claim { card_id: Uuid },

    /// Show tier progress of a deck
    Progress { deck_id: String },

    /// Unlock a tier and load its cards
    Unlock { deck_id: String, tier: Tier },

    /// Show a card's body, generating it if needed
    Body { card_id: Uuid },

    /// Show store statistics
    Stats,

    /// Delete every stored deck, card and claim
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let engine = open_engine(&cli)?;

    match cli.command {
        Commands::Deck { deck_id } => {
            let node = engine.get_deck(&deck_id);
            let deck = node.and_then(|node| {
                let kind = engine.children_of(&node.id)?;
                Ok(DeckDto::from_node(&node, &kind))
            });
            print_json(deck)
        }
        Commands::Children { deck_id } => {
            let deck = match engine.get_deck(&deck_id) {
                Ok(node) => engine
                    .ensure_children(&node.id)
                    .await
                    .map(|kind| DeckDto::from_node(&node, &kind)),
                Err(e) => Err(e),
            };
            print_json(deck)
        }
        Commands::Tier { deck_id, tier } => {
            let view = match engine.load_tier(&deck_id, tier).await {
                Ok(_) => tier_view(&engine, &deck_id, tier),
                Err(e) => Err(e),
            };
            print_json(view)
        }
        Commands::Claim { card_id } => print_json(engine.claim_card(card_id)),
        Commands::Progress { deck_id } => print_json(engine.get_tier_completion(&deck_id)),
        Commands::Unlock { deck_id, tier } => print_json(engine.unlock_tier(&deck_id, tier).await),
        Commands::Body { card_id } => {
            let body = engine.card_body(card_id).await.map(|body| CardBodyDto {
                card_id: card_id.to_string(),
                body,
            });
            print_json(body)
        }
        Commands::Stats => print_json(engine.stats()),
        Commands::Reset { yes } => {
            if !yes {
                bail!("Refusing to reset without --yes");
            }
            print_json(engine.reset().map(|_| serde_json::json!({ "reset": true })))
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

/// Environment first, then command line flags on top
fn open_engine(cli: &Cli) -> Result<DeckEngine> {
    let mut config = EngineConfig::from_env().to_error_response().map_err(anyhow::Error::msg)?;

    if cli.memory {
        config.database_path = None;
    } else if let Some(path) = &cli.database {
        config.database_path = Some(path.clone());
    }
    if let Some(url) = &cli.gateway_url {
        config.gateway_url = url.clone();
    }
    if let Some(path) = &cli.hierarchy {
        config.hierarchy_path = Some(path.clone());
    }
    if cli.no_prefetch {
        config.prefetch_next_tier = false;
    }

    let engine = DeckEngine::open(config)
        .to_error_response()
        .map_err(anyhow::Error::msg)?;
    Ok(engine)
}

fn tier_view(engine: &DeckEngine, deck_id: &str, tier: Tier) -> AppResult<TierDto> {
    let snapshot = engine.ensure_tier(deck_id, tier)?;
    let claimed = engine.claimed_ids()?;
    Ok(TierDto::from_snapshot(&snapshot, &claimed))
}

fn print_json<T: Serialize>(result: AppResult<T>) -> Result<()> {
    let value = result.to_error_response().map_err(anyhow::Error::msg)?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
