// src/services/claim_ledger.rs
//
// Claim Ledger
//
// CRITICAL RULES:
// - Claims are idempotent: a repeated claim changes nothing and emits nothing
// - Only cards that exist can be claimed
// - CardClaimed is emitted after the claim is stored, so subscribers always
//   read the new state

use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{ClaimOutcome, ClaimRecord};
use crate::error::{AppError, AppResult};
use crate::events::{CardClaimed, EventBus};
use crate::repositories::{CardRepository, ClaimRepository};

pub struct ClaimLedger {
    card_repo: Arc<dyn CardRepository>,
    claim_repo: Arc<dyn ClaimRepository>,
    event_bus: Arc<EventBus>,
}

impl ClaimLedger {
    pub fn new(
        card_repo: Arc<dyn CardRepository>,
        claim_repo: Arc<dyn ClaimRepository>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            card_repo,
            claim_repo,
            event_bus,
        }
    }

    pub fn claim(&self, card_id: Uuid) -> AppResult<ClaimOutcome> {
        let card = self.card_repo.get_card(card_id)?.ok_or(AppError::NotFound)?;

        if !self.claim_repo.claim(card.id)? {
            log::debug!("Card {} was already claimed", card.id);
            return Ok(ClaimOutcome::AlreadyClaimed);
        }

        log::info!("Claimed card {} ({} #{} of '{}')", card.id, card.tier, card.ordinal, card.deck_id);
        self.event_bus
            .emit(CardClaimed::new(card.id, card.deck_id, card.tier));

        Ok(ClaimOutcome::Claimed)
    }

    pub fn is_claimed(&self, card_id: Uuid) -> AppResult<bool> {
        self.claim_repo.is_claimed(card_id)
    }

    pub fn get_claim(&self, card_id: Uuid) -> AppResult<Option<ClaimRecord>> {
        self.claim_repo.get_claim(card_id)
    }

    pub fn claimed_ids(&self) -> AppResult<HashSet<Uuid>> {
        self.claim_repo.claimed_ids()
    }
}
