// events/types.rs
//
// All domain events in the system.
// Each event represents an immutable fact that has already occurred.
//
// CRITICAL RULES:
// - Events are facts, not commands
// - Events are immutable
// - Events carry only the data needed to react
// - No business logic in event types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{CardStub, Tier, TierStatus};

/// Trait that all domain events must implement
pub trait DomainEvent: std::fmt::Debug + Clone {
    /// Unique identifier for this event instance
    fn event_id(&self) -> Uuid;

    /// When this event occurred
    fn occurred_at(&self) -> DateTime<Utc>;

    /// Human-readable event type name
    fn event_type(&self) -> &'static str;
}

// ============================================================================
// DECK TREE EVENTS
// ============================================================================

/// Emitted when a deck's children (or its leaf marker) were stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildrenResolved {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub deck_id: String,
    pub child_count: usize,
    pub is_leaf: bool,
}

impl ChildrenResolved {
    pub fn new(deck_id: String, child_count: usize, is_leaf: bool) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            deck_id,
            child_count,
            is_leaf,
        }
    }
}

impl DomainEvent for ChildrenResolved {
    fn event_id(&self) -> Uuid { self.event_id }
    fn occurred_at(&self) -> DateTime<Utc> { self.occurred_at }
    fn event_type(&self) -> &'static str { "ChildrenResolved" }
}

/// Emitted when an empty listing was discarded because the deck is too
/// shallow to be a leaf. The deck stays unresolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildrenDeferred {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub deck_id: String,
    pub depth: u32,
}

impl ChildrenDeferred {
    pub fn new(deck_id: String, depth: u32) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            deck_id,
            depth,
        }
    }
}

impl DomainEvent for ChildrenDeferred {
    fn event_id(&self) -> Uuid { self.event_id }
    fn occurred_at(&self) -> DateTime<Utc> { self.occurred_at }
    fn event_type(&self) -> &'static str { "ChildrenDeferred" }
}

// ============================================================================
// GENERATION EVENTS
// ============================================================================

/// Emitted for every streamed card, after it was persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardStreamed {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub card: CardStub,
}

impl CardStreamed {
    pub fn new(card: CardStub) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            card,
        }
    }
}

impl DomainEvent for CardStreamed {
    fn event_id(&self) -> Uuid { self.event_id }
    fn occurred_at(&self) -> DateTime<Utc> { self.occurred_at }
    fn event_type(&self) -> &'static str { "CardStreamed" }
}

/// Emitted when a tier's generation ran to completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierGenerated {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub deck_id: String,
    pub tier: Tier,
    pub card_count: u32,
}

impl TierGenerated {
    pub fn new(deck_id: String, tier: Tier, card_count: u32) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            deck_id,
            tier,
            card_count,
        }
    }
}

impl DomainEvent for TierGenerated {
    fn event_id(&self) -> Uuid { self.event_id }
    fn occurred_at(&self) -> DateTime<Utc> { self.occurred_at }
    fn event_type(&self) -> &'static str { "TierGenerated" }
}

/// Emitted when a tier's generation failed. Cards streamed before the
/// failure stay stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierGenerationFailed {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub deck_id: String,
    pub tier: Tier,
    pub cards_kept: u32,
    pub error: String,
}

impl TierGenerationFailed {
    pub fn new(deck_id: String, tier: Tier, cards_kept: u32, error: String) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            deck_id,
            tier,
            cards_kept,
            error,
        }
    }
}

impl DomainEvent for TierGenerationFailed {
    fn event_id(&self) -> Uuid { self.event_id }
    fn occurred_at(&self) -> DateTime<Utc> { self.occurred_at }
    fn event_type(&self) -> &'static str { "TierGenerationFailed" }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardContentGenerated {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub card_id: Uuid,
}

impl CardContentGenerated {
    pub fn new(card_id: Uuid) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            card_id,
        }
    }
}

impl DomainEvent for CardContentGenerated {
    fn event_id(&self) -> Uuid { self.event_id }
    fn occurred_at(&self) -> DateTime<Utc> { self.occurred_at }
    fn event_type(&self) -> &'static str { "CardContentGenerated" }
}

// ============================================================================
// PROGRESS EVENTS
// ============================================================================

/// Emitted once per card, on its first claim
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardClaimed {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub card_id: Uuid,
    pub deck_id: String,
    pub tier: Tier,
}

impl CardClaimed {
    pub fn new(card_id: Uuid, deck_id: String, tier: Tier) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            card_id,
            deck_id,
            tier,
        }
    }
}

impl DomainEvent for CardClaimed {
    fn event_id(&self) -> Uuid { self.event_id }
    fn occurred_at(&self) -> DateTime<Utc> { self.occurred_at }
    fn event_type(&self) -> &'static str { "CardClaimed" }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierStatusChanged {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub deck_id: String,
    pub tier: Tier,
    pub from: TierStatus,
    pub to: TierStatus,
}

impl TierStatusChanged {
    pub fn new(deck_id: String, tier: Tier, from: TierStatus, to: TierStatus) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            deck_id,
            tier,
            from,
            to,
        }
    }
}

impl DomainEvent for TierStatusChanged {
    fn event_id(&self) -> Uuid { self.event_id }
    fn occurred_at(&self) -> DateTime<Utc> { self.occurred_at }
    fn event_type(&self) -> &'static str { "TierStatusChanged" }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierCompleted {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub deck_id: String,
    pub tier: Tier,
}

impl TierCompleted {
    pub fn new(deck_id: String, tier: Tier) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            deck_id,
            tier,
        }
    }
}

impl DomainEvent for TierCompleted {
    fn event_id(&self) -> Uuid { self.event_id }
    fn occurred_at(&self) -> DateTime<Utc> { self.occurred_at }
    fn event_type(&self) -> &'static str { "TierCompleted" }
}
