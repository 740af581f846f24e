// src/domain/mod.rs
//
// Domain Root - The Single Source of Truth for Domain API
//
// This file MUST declare all domain modules and re-export their public API.
// All other modules import from `crate::domain::*`

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod card;
pub mod deck;
pub mod taxonomy;
pub mod tier;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// Deck Domain
pub use deck::{
    child_id, ensure_leaf_allowed, validate_children, validate_deck_node, DeckKind, DeckNode,
    DeckOrigin, DeckRef, StoredChildren, MIN_LEAF_DEPTH,
};

// Card Domain
pub use card::{
    validate_card_stub, validate_generated_card, CardContent, CardStub, ClaimOutcome,
    ClaimRecord, GeneratedCard,
};

// Tier Domain (Derived Data)
pub use tier::{
    check_unlock, derive_status, DeckCompletion, Tier, TierCounts, TierProgress, TierStatus,
};

// Static taxonomy
pub use taxonomy::{StaticTaxonomy, ROOT_DECK_ID};

// ============================================================================
// DOMAIN ERROR TYPES
// ============================================================================

use thiserror::Error;

/// Domain-level errors
/// These represent violations of business rules and invariants
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Deck '{deck_id}' at depth {depth} cannot be a leaf")]
    AmbiguousLeaf { deck_id: String, depth: u32 },

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Entity not found: {0}")]
    NotFound(String),
}

/// Domain result type
pub type DomainResult<T> = Result<T, DomainError>;
