// src/application/engine.rs
//
// DeckEngine - the single entry point for callers
//
// ARCHITECTURE:
// - Wires infrastructure, repositories and services once
// - Every public operation delegates to exactly one service
// - The engine owns no state of its own besides the wiring

use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::db::{
    create_connection_pool, create_memory_pool, get_connection, get_database_stats,
    reset_database, ConnectionPool, DatabaseStats,
};
use crate::domain::{
    CardStub, ClaimOutcome, DeckCompletion, DeckKind, DeckNode, StaticTaxonomy, Tier, TierStatus,
};
use crate::error::{AppError, AppResult};
use crate::events::{register_tier_tracking_handlers, EventBus};
use crate::integrations::{
    GenerationGateway, HierarchySource, HttpGenerationGateway, JsonHierarchy, NoTopicProvider,
    TopicProvider,
};
use crate::repositories::{
    CardRepository, ClaimRepository, DeckRepository, SqliteCardRepository, SqliteClaimRepository,
    SqliteDeckRepository, SqliteTierStateRepository, TierStateRepository,
};
use crate::services::{ClaimLedger, DeckResolver, GenerationOrchestrator, TierSnapshot, TierTracker};

/// Outcome of an explicit unlock: the new status and the tier's cards
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnlockedTier {
    pub deck_id: String,
    pub tier: Tier,
    pub status: TierStatus,
    pub cards: Vec<CardStub>,
}

pub struct DeckEngine {
    pool: Arc<ConnectionPool>,
    event_bus: Arc<EventBus>,
    resolver: Arc<DeckResolver>,
    orchestrator: Arc<GenerationOrchestrator>,
    tracker: Arc<TierTracker>,
    ledger: Arc<ClaimLedger>,
}

impl DeckEngine {
    /// Open the store named by the configuration and talk to the HTTP
    /// generation service.
    pub fn open(config: EngineConfig) -> AppResult<Self> {
        let pool = match &config.database_path {
            Some(path) => {
                log::info!("Opening deck store at {}", path.display());
                create_connection_pool(path)?
            }
            None => {
                log::info!("Using an in-memory deck store");
                create_memory_pool()?
            }
        };

        let hierarchy: Option<Arc<dyn HierarchySource>> = match &config.hierarchy_path {
            Some(path) => {
                let hierarchy = JsonHierarchy::from_file(path, &StaticTaxonomy::new())?;
                log::info!(
                    "Loaded {} pre-built decks from {}",
                    hierarchy.len(),
                    path.display()
                );
                Some(Arc::new(hierarchy))
            }
            None => None,
        };

        let gateway = Arc::new(HttpGenerationGateway::new(&config)?);

        Ok(Self::new(
            Arc::new(pool),
            gateway,
            Arc::new(NoTopicProvider),
            hierarchy,
            &config,
        ))
    }

    pub fn new(
        pool: Arc<ConnectionPool>,
        gateway: Arc<dyn GenerationGateway>,
        topics: Arc<dyn TopicProvider>,
        hierarchy: Option<Arc<dyn HierarchySource>>,
        config: &EngineConfig,
    ) -> Self {
        // 1. INFRASTRUCTURE
        let event_bus = Arc::new(EventBus::new());
        let taxonomy = Arc::new(StaticTaxonomy::new());

        // 2. REPOSITORIES
        let deck_repo: Arc<dyn DeckRepository> = Arc::new(SqliteDeckRepository::new(pool.clone()));
        let card_repo: Arc<dyn CardRepository> = Arc::new(SqliteCardRepository::new(pool.clone()));
        let claim_repo: Arc<dyn ClaimRepository> = Arc::new(SqliteClaimRepository::new(pool.clone()));
        let tier_state_repo: Arc<dyn TierStateRepository> =
            Arc::new(SqliteTierStateRepository::new(pool.clone()));

        // 3. SERVICES
        let resolver = Arc::new(DeckResolver::new(
            taxonomy,
            hierarchy,
            deck_repo,
            gateway.clone(),
            topics,
            event_bus.clone(),
            config.min_topic_suggestions,
        ));
        let orchestrator = Arc::new(GenerationOrchestrator::new(
            resolver.clone(),
            card_repo.clone(),
            gateway,
            event_bus.clone(),
            config.prefetch_next_tier,
        ));
        let tracker = Arc::new(TierTracker::new(
            card_repo.clone(),
            claim_repo.clone(),
            tier_state_repo,
            event_bus.clone(),
        ));
        let ledger = Arc::new(ClaimLedger::new(card_repo, claim_repo, event_bus.clone()));

        // 4. EVENT HANDLERS
        register_tier_tracking_handlers(&event_bus, tracker.clone());

        Self {
            pool,
            event_bus,
            resolver,
            orchestrator,
            tracker,
            ledger,
        }
    }

    // ========================================================================
    // DECK TREE
    // ========================================================================

    pub fn get_deck(&self, deck_id: &str) -> AppResult<DeckNode> {
        self.resolver.resolve(deck_id)?.ok_or(AppError::NotFound)
    }

    /// Children known right now; unresolved decks resolve in the background
    pub fn children_of(&self, deck_id: &str) -> AppResult<DeckKind> {
        self.resolver.children_of(deck_id)
    }

    pub async fn ensure_children(&self, deck_id: &str) -> AppResult<DeckKind> {
        self.resolver.ensure_children(deck_id).await
    }

    // ========================================================================
    // TIERS AND CARDS
    // ========================================================================

    /// Current tier state; generation continues in the background
    pub fn ensure_tier(&self, deck_id: &str, tier: Tier) -> AppResult<TierSnapshot> {
        self.orchestrator.ensure_tier(deck_id, tier)
    }

    pub async fn load_tier(&self, deck_id: &str, tier: Tier) -> AppResult<Vec<CardStub>> {
        self.orchestrator.load_or_generate_tier(deck_id, tier).await
    }

    pub async fn card_body(&self, card_id: Uuid) -> AppResult<String> {
        self.orchestrator.load_or_generate_card_body(card_id).await
    }

    // ========================================================================
    // PROGRESS
    // ========================================================================

    pub fn claim_card(&self, card_id: Uuid) -> AppResult<ClaimOutcome> {
        self.ledger.claim(card_id)
    }

    pub fn claimed_ids(&self) -> AppResult<HashSet<Uuid>> {
        self.ledger.claimed_ids()
    }

    pub fn get_tier_completion(&self, deck_id: &str) -> AppResult<DeckCompletion> {
        let deck = self.get_deck(deck_id)?;
        self.tracker.completion(&deck.id)
    }

    /// Unlock a tier, then hand back its cards. A generation already running
    /// for the tier (a prefetch, usually) is joined.
    pub async fn unlock_tier(&self, deck_id: &str, tier: Tier) -> AppResult<UnlockedTier> {
        let deck = self.get_deck(deck_id)?;
        let status = self.tracker.unlock(&deck.id, tier)?;
        let cards = self
            .orchestrator
            .load_or_generate_tier(&deck.id, tier)
            .await?;

        Ok(UnlockedTier {
            deck_id: deck.id,
            tier,
            status,
            cards,
        })
    }

    // ========================================================================
    // HOUSEKEEPING
    // ========================================================================

    /// Wipe all stored data. Generations still running are detached first so
    /// nothing they produce lands in the emptied store.
    pub fn reset(&self) -> AppResult<()> {
        self.orchestrator.detach_tasks();
        self.resolver.detach_tasks();

        let mut conn = get_connection(&self.pool)?;
        reset_database(&mut conn)?;
        self.event_bus.clear_event_log();

        log::warn!("Deck store reset");
        Ok(())
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.event_bus)
    }

    pub fn stats(&self) -> AppResult<DatabaseStats> {
        let conn = get_connection(&self.pool)?;
        get_database_stats(&conn)
    }
}
