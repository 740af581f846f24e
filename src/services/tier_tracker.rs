// src/services/tier_tracker.rs
//
// Tier Completion Tracker
//
// CRITICAL RULES:
// - Status is derived from cards, claims and the persisted status only
// - A status never goes down; every advance is persisted
// - Recomputation is serialized so two concurrent recomputes cannot write
//   an older status over a newer one
// - Events are emitted after the recompute lock is released

use std::sync::{Arc, Mutex, PoisonError};

use crate::domain::{
    check_unlock, derive_status, DeckCompletion, Tier, TierCounts, TierProgress, TierStatus,
};
use crate::error::AppResult;
use crate::events::{EventBus, TierCompleted, TierStatusChanged};
use crate::repositories::{CardRepository, ClaimRepository, TierStateRepository};

pub struct TierTracker {
    card_repo: Arc<dyn CardRepository>,
    claim_repo: Arc<dyn ClaimRepository>,
    tier_state_repo: Arc<dyn TierStateRepository>,
    event_bus: Arc<EventBus>,
    recompute_lock: Mutex<()>,
}

/// Status transition waiting to be announced
struct Transition {
    deck_id: String,
    tier: Tier,
    from: TierStatus,
    to: TierStatus,
}

impl TierTracker {
    pub fn new(
        card_repo: Arc<dyn CardRepository>,
        claim_repo: Arc<dyn ClaimRepository>,
        tier_state_repo: Arc<dyn TierStateRepository>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            card_repo,
            claim_repo,
            tier_state_repo,
            event_bus,
            recompute_lock: Mutex::new(()),
        }
    }

    /// Raw counts of one tier
    pub fn counts(&self, deck_id: &str, tier: Tier) -> AppResult<TierCounts> {
        Ok(TierCounts {
            total: self.card_repo.count_tier_cards(deck_id, tier)?,
            claimed: self.claim_repo.count_claimed_in_tier(deck_id, tier)?,
            generated: self.card_repo.is_tier_generated(deck_id, tier)?,
        })
    }

    /// Recompute all three tiers of a deck, persisting any advance
    pub fn recompute_deck(&self, deck_id: &str) -> AppResult<DeckCompletion> {
        let mut transitions = Vec::new();
        let completion = {
            let _lock = self.lock();
            self.recompute_locked(deck_id, &mut transitions)?
        };
        self.announce(transitions);
        Ok(completion)
    }

    /// Current progress of a deck
    pub fn completion(&self, deck_id: &str) -> AppResult<DeckCompletion> {
        self.recompute_deck(deck_id)
    }

    pub fn status(&self, deck_id: &str, tier: Tier) -> AppResult<TierStatus> {
        Ok(self.recompute_deck(deck_id)?.get(tier).status)
    }

    /// Explicit user unlock. Locked tiers cannot be unlocked; open tiers are
    /// left as they are.
    pub fn unlock(&self, deck_id: &str, tier: Tier) -> AppResult<TierStatus> {
        let mut transitions = Vec::new();
        let status = {
            let _lock = self.lock();
            let current = self.recompute_locked(deck_id, &mut transitions)?;
            let status = current.get(tier).status;

            if check_unlock(tier, status)? {
                self.tier_state_repo
                    .set_status(deck_id, tier, TierStatus::Unlocked)?;
                transitions.push(Transition {
                    deck_id: deck_id.to_string(),
                    tier,
                    from: status,
                    to: TierStatus::Unlocked,
                });
                log::info!("Unlocked {} of '{}'", tier, deck_id);

                // an unlocked tier may already be fully claimed
                self.recompute_locked(deck_id, &mut transitions)?
                    .get(tier)
                    .status
            } else {
                log::debug!("{} of '{}' is already {}", tier, deck_id, status);
                status
            }
        };
        self.announce(transitions);
        Ok(status)
    }

    fn recompute_locked(
        &self,
        deck_id: &str,
        transitions: &mut Vec<Transition>,
    ) -> AppResult<DeckCompletion> {
        let mut previous: Option<TierStatus> = None;
        let mut progress = Vec::with_capacity(Tier::ALL.len());

        for tier in Tier::ALL {
            let counts = self.counts(deck_id, tier)?;
            let persisted = self.tier_state_repo.get_status(deck_id, tier)?;
            let stored = persisted.unwrap_or_else(|| TierStatus::initial(tier));
            let status = derive_status(tier, persisted, previous, &counts);

            if status > stored {
                self.tier_state_repo.set_status(deck_id, tier, status)?;
                transitions.push(Transition {
                    deck_id: deck_id.to_string(),
                    tier,
                    from: stored,
                    to: status,
                });
            }

            progress.push(TierProgress {
                tier,
                status,
                claimed: counts.claimed,
                total: counts.total,
                complete: status == TierStatus::Complete,
            });
            previous = Some(status);
        }

        Ok(DeckCompletion {
            deck_id: deck_id.to_string(),
            core: progress[0],
            deep_dive_1: progress[1],
            deep_dive_2: progress[2],
        })
    }

    fn announce(&self, transitions: Vec<Transition>) {
        for t in transitions {
            log::info!("{} of '{}': {} -> {}", t.tier, t.deck_id, t.from, t.to);
            let completed = t.to == TierStatus::Complete;
            self.event_bus.emit(TierStatusChanged::new(
                t.deck_id.clone(),
                t.tier,
                t.from,
                t.to,
            ));
            if completed {
                self.event_bus.emit(TierCompleted::new(t.deck_id, t.tier));
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.recompute_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
