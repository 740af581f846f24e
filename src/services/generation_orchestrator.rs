// src/services/generation_orchestrator.rs
//
// Generation Orchestrator - cache reads against generation
//
// CRITICAL RULES:
// - A running task for a key is always joined, never duplicated
// - A tier is a cache hit only once its generation ran to completion
// - Each streamed card is stored before anyone is told about it
// - Cards stored by an earlier, failed attempt are kept; a new attempt
//   only appends the cards beyond them
// - Writes from a task that is no longer current are dropped
// - The orchestrator never unlocks a tier; the tracker owns tier status

use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use uuid::Uuid;

use crate::domain::{validate_generated_card, CardStub, DeckNode, Tier};
use crate::error::{AppError, AppResult, GenerationError, GenerationResult};
use crate::events::{
    CardContentGenerated, CardStreamed, EventBus, TierGenerated, TierGenerationFailed,
};
use crate::integrations::{CardBodyRequest, GenerationEvent, GenerationGateway, TierRequest};
use crate::repositories::CardRepository;
use crate::services::deck_resolver::DeckResolver;
use crate::services::task_registry::{Registration, TaskGuard, TaskRegistry};

type TierKey = (String, Tier);

/// What is known about a tier at the moment of asking
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierSnapshot {
    pub deck_id: String,
    pub tier: Tier,
    pub cards: Vec<CardStub>,
    /// A generation for this tier is running
    pub generating: bool,
    /// The tier's generation ran to completion
    pub generated: bool,
}

pub struct GenerationOrchestrator {
    resolver: Arc<DeckResolver>,
    card_repo: Arc<dyn CardRepository>,
    gateway: Arc<dyn GenerationGateway>,
    event_bus: Arc<EventBus>,
    tier_tasks: TaskRegistry<TierKey, Vec<CardStub>>,
    body_tasks: TaskRegistry<Uuid, String>,
    /// Cards of tiers being generated, in stream order
    projection: RwLock<HashMap<TierKey, Vec<CardStub>>>,
    prefetch_next_tier: bool,
}

impl GenerationOrchestrator {
    pub fn new(
        resolver: Arc<DeckResolver>,
        card_repo: Arc<dyn CardRepository>,
        gateway: Arc<dyn GenerationGateway>,
        event_bus: Arc<EventBus>,
        prefetch_next_tier: bool,
    ) -> Self {
        Self {
            resolver,
            card_repo,
            gateway,
            event_bus,
            tier_tasks: TaskRegistry::new(),
            body_tasks: TaskRegistry::new(),
            projection: RwLock::new(HashMap::new()),
            prefetch_next_tier,
        }
    }

    // ========================================================================
    // TIERS
    // ========================================================================

    /// Cards of a tier: from the store when complete, otherwise from the
    /// running generation or a new one.
    pub async fn load_or_generate_tier(
        self: &Arc<Self>,
        deck_id: &str,
        tier: Tier,
    ) -> AppResult<Vec<CardStub>> {
        let node = self.require_deck(deck_id)?;
        let key = (node.id.clone(), tier);

        let waiter = match self
            .tier_tasks
            .begin_with(key, || self.cached_tier(&node.id, tier))?
        {
            Registration::Cached(cards) => {
                log::debug!("Cache hit for {} of '{}'", tier, node.id);
                return Ok(cards);
            }
            Registration::Joined(waiter) => {
                log::debug!("Joining running generation of {} for '{}'", tier, node.id);
                waiter
            }
            Registration::Started { guard, waiter } => {
                let this = Arc::clone(self);
                tokio::spawn(this.run_generation_chain(node, tier, guard));
                waiter
            }
        };

        Ok(waiter.wait().await?)
    }

    /// Current state of a tier, returned immediately. Starts generation in
    /// the background when the tier is neither stored nor running.
    pub fn ensure_tier(self: &Arc<Self>, deck_id: &str, tier: Tier) -> AppResult<TierSnapshot> {
        let node = self.require_deck(deck_id)?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| AppError::Other(format!("No async runtime for background generation: {}", e)))?;

        let key = (node.id.clone(), tier);
        match self
            .tier_tasks
            .begin_with(key, || self.cached_tier(&node.id, tier))?
        {
            Registration::Cached(cards) => Ok(TierSnapshot {
                deck_id: node.id,
                tier,
                cards,
                generating: false,
                generated: true,
            }),
            Registration::Joined(_) => self.snapshot(&node.id, tier),
            Registration::Started { guard, .. } => {
                let deck_id = node.id.clone();
                let this = Arc::clone(self);
                runtime.spawn(this.run_generation_chain(node, tier, guard));
                self.snapshot(&deck_id, tier)
            }
        }
    }

    /// State of a tier without starting anything
    pub fn snapshot(&self, deck_id: &str, tier: Tier) -> AppResult<TierSnapshot> {
        let key = (deck_id.to_string(), tier);
        let generating = self.tier_tasks.is_running(&key);

        let projected = if generating {
            self.projection_read().get(&key).cloned()
        } else {
            None
        };
        let cards = match projected {
            Some(cards) => cards,
            None => self.card_repo.get_tier_cards(deck_id, tier)?.unwrap_or_default(),
        };

        Ok(TierSnapshot {
            deck_id: deck_id.to_string(),
            tier,
            cards,
            generating,
            generated: self.card_repo.is_tier_generated(deck_id, tier)?,
        })
    }

    pub fn is_generating(&self, deck_id: &str, tier: Tier) -> bool {
        self.tier_tasks.is_running(&(deck_id.to_string(), tier))
    }

    fn cached_tier(&self, deck_id: &str, tier: Tier) -> AppResult<Option<Vec<CardStub>>> {
        if !self.card_repo.is_tier_generated(deck_id, tier)? {
            return Ok(None);
        }
        Ok(self
            .card_repo
            .get_tier_cards(deck_id, tier)?
            .filter(|cards| !cards.is_empty()))
    }

    /// Generate a tier, then keep generating the following tiers in the
    /// background while prefetching is on.
    async fn run_generation_chain(
        self: Arc<Self>,
        node: DeckNode,
        tier: Tier,
        guard: TaskGuard<TierKey, Vec<CardStub>>,
    ) {
        let mut next = Some((tier, guard));

        while let Some((tier, guard)) = next.take() {
            let succeeded = self.run_tier(&node, tier, guard).await;
            if succeeded && self.prefetch_next_tier {
                next = self.begin_prefetch(&node, tier);
            }
        }
    }

    fn begin_prefetch(
        &self,
        node: &DeckNode,
        finished: Tier,
    ) -> Option<(Tier, TaskGuard<TierKey, Vec<CardStub>>)> {
        let tier = finished.next()?;
        let key = (node.id.clone(), tier);

        match self.tier_tasks.begin_with(key, || self.cached_tier(&node.id, tier)) {
            Ok(Registration::Started { guard, .. }) => {
                log::info!("Prefetching {} of '{}'", tier, node.id);
                Some((tier, guard))
            }
            Ok(_) => None,
            Err(e) => {
                log::warn!("Could not prefetch {} of '{}': {}", tier, node.id, e);
                None
            }
        }
    }

    /// Run one tier generation to its end. Returns true on success.
    async fn run_tier(
        &self,
        node: &DeckNode,
        tier: Tier,
        guard: TaskGuard<TierKey, Vec<CardStub>>,
    ) -> bool {
        match self.stream_tier(node, tier, &guard).await {
            Ok(cards) => {
                log::info!("Generated {} of '{}': {} cards", tier, node.id, cards.len());
                if guard.is_current() {
                    self.drop_projection(&node.id, tier);
                    self.event_bus
                        .emit(TierGenerated::new(node.id.clone(), tier, cards.len() as u32));
                }
                guard.complete(cards);
                true
            }
            Err(e) => {
                let kept = match self.card_repo.count_tier_cards(&node.id, tier) {
                    Ok(count) => count,
                    Err(count_error) => {
                        log::warn!("Could not count kept cards: {}", count_error);
                        0
                    }
                };
                log::warn!(
                    "Generation of {} for '{}' failed ({} cards kept): {}",
                    tier,
                    node.id,
                    kept,
                    e
                );
                if guard.is_current() {
                    self.drop_projection(&node.id, tier);
                    self.event_bus.emit(TierGenerationFailed::new(
                        node.id.clone(),
                        tier,
                        kept,
                        e.to_string(),
                    ));
                }
                guard.fail(e);
                false
            }
        }
    }

    async fn stream_tier(
        &self,
        node: &DeckNode,
        tier: Tier,
        guard: &TaskGuard<TierKey, Vec<CardStub>>,
    ) -> GenerationResult<Vec<CardStub>> {
        let deck_id = node.id.as_str();

        let mut cards = self.card_repo.get_tier_cards(deck_id, tier)?.unwrap_or_default();
        let already_stored = cards.len();
        self.replace_projection(deck_id, tier, cards.clone());

        let request = TierRequest {
            deck_name: node.name.clone(),
            tier,
            previous_cards: self.previous_titles(deck_id, tier)?,
            parent_path: node.parent_path.clone(),
        };

        log::info!(
            "Generating {} of '{}' ({} cards already stored)",
            tier,
            deck_id,
            already_stored
        );
        let mut stream = self.gateway.generate_tier(request).await?;
        let mut received = 0usize;

        while let Some(event) = stream.recv().await {
            match event {
                GenerationEvent::CardArrived(generated) => {
                    if let Err(e) = validate_generated_card(&generated) {
                        log::warn!("Skipping card {} of {} for '{}': {}", generated.number, tier, deck_id, e);
                        continue;
                    }
                    // only cards that pass validation were ever stored
                    received += 1;
                    if received <= already_stored {
                        continue;
                    }
                    if !guard.is_current() {
                        log::warn!(
                            "Stale write ignored: card '{}' for {} of '{}'",
                            generated.title,
                            tier,
                            deck_id
                        );
                        continue;
                    }

                    let card = self
                        .card_repo
                        .append_streamed_card(deck_id, tier, generated.title.trim())?;
                    if let Some(body) = generated.body.as_deref().filter(|b| !b.trim().is_empty()) {
                        self.card_repo.set_card_content(card.id, body.trim())?;
                    }

                    self.merge_into_projection(&card);
                    self.event_bus.emit(CardStreamed::new(card.clone()));
                    cards.push(card);
                }
                GenerationEvent::Completed => {
                    if cards.is_empty() {
                        return Err(GenerationError::EmptyResult);
                    }
                    if guard.is_current() {
                        self.card_repo
                            .mark_tier_generated(deck_id, tier, cards.len() as u32)?;
                    }
                    return Ok(cards);
                }
                GenerationEvent::Failed(e) => return Err(e),
            }
        }

        Err(GenerationError::Interrupted)
    }

    /// Titles of every card in the tiers before `tier`
    fn previous_titles(&self, deck_id: &str, tier: Tier) -> AppResult<Vec<String>> {
        let mut titles = Vec::new();
        for previous in tier.predecessors() {
            if let Some(cards) = self.card_repo.get_tier_cards(deck_id, previous)? {
                titles.extend(cards.into_iter().map(|c| c.title));
            }
        }
        Ok(titles)
    }

    // ========================================================================
    // CARD BODIES
    // ========================================================================

    /// Body of a card, generated on first request and stored for good
    pub async fn load_or_generate_card_body(self: &Arc<Self>, card_id: Uuid) -> AppResult<String> {
        let card = self.card_repo.get_card(card_id)?.ok_or(AppError::NotFound)?;

        let waiter = match self
            .body_tasks
            .begin_with(card.id, || self.card_repo.get_card_content(card.id))?
        {
            Registration::Cached(body) => return Ok(body),
            Registration::Joined(waiter) => waiter,
            Registration::Started { guard, waiter } => {
                let this = Arc::clone(self);
                tokio::spawn(async move {
                    match this.generate_body(&card, &guard).await {
                        Ok(body) => guard.complete(body),
                        Err(e) => {
                            log::warn!("Body generation for card {} failed: {}", card.id, e);
                            guard.fail(e);
                        }
                    }
                });
                waiter
            }
        };

        Ok(waiter.wait().await?)
    }

    async fn generate_body(
        &self,
        card: &CardStub,
        guard: &TaskGuard<Uuid, String>,
    ) -> GenerationResult<String> {
        let deck_name = self
            .resolver
            .resolve(&card.deck_id)?
            .map(|node| node.name)
            .unwrap_or_else(|| card.deck_id.clone());

        let mut known_cards = Vec::new();
        for tier in Tier::ALL {
            if let Some(cards) = self.card_repo.get_tier_cards(&card.deck_id, tier)? {
                known_cards.extend(cards.into_iter().map(|c| c.title));
            }
        }

        let body = self
            .gateway
            .generate_card_body(CardBodyRequest {
                deck_name,
                card_number: card.ordinal,
                title: card.title.clone(),
                known_cards,
            })
            .await?;

        let body = body.trim().to_string();
        if body.is_empty() {
            return Err(GenerationError::EmptyResult);
        }

        if !guard.is_current() {
            log::warn!("Stale write ignored: body of card {}", card.id);
            return Ok(body);
        }

        self.card_repo.set_card_content(card.id, &body)?;
        self.event_bus.emit(CardContentGenerated::new(card.id));

        // the first stored body wins
        Ok(self.card_repo.get_card_content(card.id)?.unwrap_or(body))
    }

    // ========================================================================
    // PROJECTION
    // ========================================================================

    fn replace_projection(&self, deck_id: &str, tier: Tier, cards: Vec<CardStub>) {
        self.projection_write()
            .insert((deck_id.to_string(), tier), cards);
    }

    /// Append a streamed card; a card already present is never added twice
    fn merge_into_projection(&self, card: &CardStub) {
        let key = (card.deck_id.clone(), card.tier);
        let mut projection = self.projection_write();
        let cards = projection.entry(key.clone()).or_default();
        let position = card.ordinal as usize;

        if position == cards.len() + 1 {
            cards.push(card.clone());
        } else if position > cards.len() + 1 {
            // out of step with the store; the next snapshot reads the store
            projection.remove(&key);
        }
    }

    /// The store is the source of truth once a generation has ended
    fn drop_projection(&self, deck_id: &str, tier: Tier) {
        self.projection_write().remove(&(deck_id.to_string(), tier));
    }

    #[cfg(test)]
    pub(crate) fn projected_tiers(&self) -> usize {
        self.projection_read().len()
    }

    fn projection_read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<TierKey, Vec<CardStub>>> {
        self.projection.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn projection_write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<TierKey, Vec<CardStub>>> {
        self.projection.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ========================================================================
    // HOUSEKEEPING
    // ========================================================================

    fn require_deck(&self, deck_id: &str) -> AppResult<DeckNode> {
        self.resolver.resolve(deck_id)?.ok_or(AppError::NotFound)
    }

    /// Forget running generations and the projection. Tasks still running
    /// finish for their waiters but store nothing more.
    pub fn detach_tasks(&self) {
        self.tier_tasks.clear();
        self.body_tasks.clear();
        self.projection_write().clear();
    }
}
