// src/services/test_support.rs
//
// Shared fixtures for service tests: a scripted generator and the full set
// of services wired over an in-memory store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use crate::db::{create_memory_pool, reset_database, ConnectionPool};
use crate::domain::{GeneratedCard, StaticTaxonomy, Tier};
use crate::error::{GenerationError, GenerationResult};
use crate::events::{register_tier_tracking_handlers, EventBus};
use crate::integrations::{
    card_stream, CardBodyRequest, CardStream, GenerationEvent, GenerationGateway,
    NoTopicProvider, SubDeckListing, SubDeckRequest, TierRequest, TopicProvider,
};
use crate::repositories::{
    CardRepository, SqliteCardRepository, SqliteClaimRepository, SqliteDeckRepository,
    SqliteTierStateRepository,
};
use crate::services::{ClaimLedger, DeckResolver, GenerationOrchestrator, TierTracker};

/// Generator with canned output, call counters and optional latency
pub struct ScriptedGateway {
    tier_calls: AtomicUsize,
    listing_calls: AtomicUsize,
    body_calls: AtomicUsize,
    titles: HashMap<Tier, Vec<String>>,
    listings: HashMap<String, SubDeckListing>,
    card_delays_ms: Vec<u64>,
    latency_ms: u64,
    fail_after: Mutex<Option<usize>>,
    requests: Mutex<Vec<TierRequest>>,
}

impl ScriptedGateway {
    /// Five cards per tier, named after the tier; every deck is a leaf
    pub fn new() -> Self {
        let titles = Tier::ALL
            .iter()
            .map(|tier| {
                let titles = (1..=5).map(|n| format!("{} {}", tier, n)).collect();
                (*tier, titles)
            })
            .collect();

        Self {
            tier_calls: AtomicUsize::new(0),
            listing_calls: AtomicUsize::new(0),
            body_calls: AtomicUsize::new(0),
            titles,
            listings: HashMap::new(),
            card_delays_ms: Vec::new(),
            latency_ms: 0,
            fail_after: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_titles(mut self, tier: Tier, titles: &[&str]) -> Self {
        self.titles
            .insert(tier, titles.iter().map(|t| t.to_string()).collect());
        self
    }

    /// Listing returned for a deck, looked up by display name
    pub fn with_listing(mut self, deck_name: &str, listing: SubDeckListing) -> Self {
        self.listings.insert(deck_name.to_string(), listing);
        self
    }

    /// Delay before each streamed card, cycled
    pub fn with_card_delays(mut self, delays_ms: &[u64]) -> Self {
        self.card_delays_ms = delays_ms.to_vec();
        self
    }

    /// Delay before listings and card bodies are returned
    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// The next tier generation fails after `cards` cards
    pub fn failing_after(self, cards: usize) -> Self {
        *self.fail_after.lock().unwrap() = Some(cards);
        self
    }

    pub fn tier_calls(&self) -> usize {
        self.tier_calls.load(Ordering::SeqCst)
    }

    pub fn listing_calls(&self) -> usize {
        self.listing_calls.load(Ordering::SeqCst)
    }

    pub fn body_calls(&self) -> usize {
        self.body_calls.load(Ordering::SeqCst)
    }

    pub fn tier_requests(&self) -> Vec<TierRequest> {
        self.requests.lock().unwrap().clone()
    }

    async fn latency(&self) {
        if self.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.latency_ms)).await;
        }
    }
}

#[async_trait]
impl GenerationGateway for ScriptedGateway {
    async fn list_sub_decks(&self, request: SubDeckRequest) -> GenerationResult<SubDeckListing> {
        self.listing_calls.fetch_add(1, Ordering::SeqCst);
        self.latency().await;
        Ok(self
            .listings
            .get(&request.deck_name)
            .cloned()
            .unwrap_or(SubDeckListing::Leaf))
    }

    async fn generate_tier(&self, request: TierRequest) -> GenerationResult<CardStream> {
        self.tier_calls.fetch_add(1, Ordering::SeqCst);

        let titles = self.titles.get(&request.tier).cloned().unwrap_or_default();
        let delays = self.card_delays_ms.clone();
        let fail_after = self.fail_after.lock().unwrap().take();
        self.requests.lock().unwrap().push(request);

        let (tx, rx) = card_stream();
        tokio::spawn(async move {
            for (index, title) in titles.into_iter().enumerate() {
                if fail_after == Some(index) {
                    let _ = tx
                        .send(GenerationEvent::Failed(GenerationError::Transport(
                            "connection reset".to_string(),
                        )))
                        .await;
                    return;
                }
                if !delays.is_empty() {
                    let delay = delays[index % delays.len()];
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
                let card = GeneratedCard::new(index as u32 + 1, title);
                if tx.send(GenerationEvent::CardArrived(card)).await.is_err() {
                    return;
                }
            }
            let _ = tx.send(GenerationEvent::Completed).await;
        });

        Ok(rx)
    }

    async fn generate_card_body(&self, request: CardBodyRequest) -> GenerationResult<String> {
        self.body_calls.fetch_add(1, Ordering::SeqCst);
        self.latency().await;
        Ok(format!("All about {}", request.title))
    }
}

/// Every service wired together, as the engine does it
pub struct Harness {
    pub pool: Arc<ConnectionPool>,
    pub event_bus: Arc<EventBus>,
    pub gateway: Arc<ScriptedGateway>,
    pub deck_repo: Arc<SqliteDeckRepository>,
    pub card_repo: Arc<SqliteCardRepository>,
    pub resolver: Arc<DeckResolver>,
    pub orchestrator: Arc<GenerationOrchestrator>,
    pub tracker: Arc<TierTracker>,
    pub ledger: ClaimLedger,
}

impl Harness {
    pub fn new(gateway: ScriptedGateway) -> Self {
        Self::build(gateway, Arc::new(NoTopicProvider), false)
    }

    pub fn with_prefetch(gateway: ScriptedGateway) -> Self {
        Self::build(gateway, Arc::new(NoTopicProvider), true)
    }

    pub fn with_topics(gateway: ScriptedGateway, topics: Arc<dyn TopicProvider>) -> Self {
        Self::build(gateway, topics, false)
    }

    fn build(gateway: ScriptedGateway, topics: Arc<dyn TopicProvider>, prefetch: bool) -> Self {
        let pool = Arc::new(create_memory_pool().unwrap());
        let event_bus = Arc::new(EventBus::new());
        let gateway = Arc::new(gateway);
        let dyn_gateway: Arc<dyn GenerationGateway> = gateway.clone();

        let deck_repo = Arc::new(SqliteDeckRepository::new(pool.clone()));
        let card_repo = Arc::new(SqliteCardRepository::new(pool.clone()));
        let claim_repo = Arc::new(SqliteClaimRepository::new(pool.clone()));
        let tier_state_repo = Arc::new(SqliteTierStateRepository::new(pool.clone()));

        let resolver = Arc::new(DeckResolver::new(
            Arc::new(StaticTaxonomy::new()),
            None,
            deck_repo.clone(),
            dyn_gateway.clone(),
            topics,
            event_bus.clone(),
            3,
        ));

        let orchestrator = Arc::new(GenerationOrchestrator::new(
            resolver.clone(),
            card_repo.clone(),
            dyn_gateway,
            event_bus.clone(),
            prefetch,
        ));

        let tracker = Arc::new(TierTracker::new(
            card_repo.clone(),
            claim_repo.clone(),
            tier_state_repo,
            event_bus.clone(),
        ));
        register_tier_tracking_handlers(&event_bus, tracker.clone());

        let ledger = ClaimLedger::new(card_repo.clone(), claim_repo, event_bus.clone());

        Self {
            pool,
            event_bus,
            gateway,
            deck_repo,
            card_repo,
            resolver,
            orchestrator,
            tracker,
            ledger,
        }
    }

    /// Stored titles of a tier, in order
    pub fn stored_titles(&self, deck_id: &str, tier: Tier) -> Vec<String> {
        self.card_repo
            .get_tier_cards(deck_id, tier)
            .unwrap()
            .unwrap_or_default()
            .into_iter()
            .map(|card| card.title)
            .collect()
    }

    pub fn stored_ids(&self, deck_id: &str, tier: Tier) -> Vec<Uuid> {
        self.card_repo
            .get_tier_cards(deck_id, tier)
            .unwrap()
            .unwrap_or_default()
            .into_iter()
            .map(|card| card.id)
            .collect()
    }

    /// Number of logged events of one type
    pub fn events_of(&self, event_type: &str) -> usize {
        self.event_bus
            .get_event_log()
            .iter()
            .filter(|entry| entry.event_type == event_type)
            .count()
    }

    /// Full reset: detach running tasks, then wipe the store
    pub fn reset(&self) {
        self.orchestrator.detach_tasks();
        self.resolver.detach_tasks();
        let mut conn = self.pool.get().unwrap();
        reset_database(&mut conn).unwrap();
    }
}
