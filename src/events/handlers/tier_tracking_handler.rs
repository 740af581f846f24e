// src/events/handlers/tier_tracking_handler.rs
//
// Tier Tracking Event Handler
//
// Bridges claim and generation events to the TierTracker.
//
// CRITICAL RULES:
// - Only consumes CardClaimed and TierGenerated events
// - Delegates all logic to TierTracker
// - Handles errors without crashing the event bus

use std::sync::Arc;

use crate::events::{CardClaimed, EventBus, TierGenerated};
use crate::services::TierTracker;

/// Registers the tier tracking handlers with the event bus.
pub fn register_tier_tracking_handlers(bus: &EventBus, tracker: Arc<TierTracker>) {
    let claim_tracker = Arc::clone(&tracker);
    bus.subscribe::<CardClaimed, _>(move |event| {
        recompute(&claim_tracker, &event.deck_id, "claim");
    });

    let generation_tracker = Arc::clone(&tracker);
    bus.subscribe::<TierGenerated, _>(move |event| {
        recompute(&generation_tracker, &event.deck_id, "generation");
    });

    log::debug!("[TIER TRACKING] Handlers registered");
}

fn recompute(tracker: &TierTracker, deck_id: &str, trigger: &str) {
    if let Err(e) = tracker.recompute_deck(deck_id) {
        log::error!(
            "[TIER TRACKING] Recompute after {} failed for deck '{}': {}",
            trigger,
            deck_id,
            e
        );
    }
}
