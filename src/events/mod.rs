// src/events/mod.rs
//
// Internal Event System - Public API
//
// CRITICAL: EventHandler is INTERNAL and must NOT be exported

pub mod bus;
pub mod handlers;
pub mod types;

// ============================================================================
// PUBLIC EXPORTS - Event Types and Bus Only
// ============================================================================

pub use types::DomainEvent;

pub use types::{
    // Deck tree
    ChildrenDeferred,
    ChildrenResolved,

    // Generation
    CardContentGenerated,
    CardStreamed,
    TierGenerated,
    TierGenerationFailed,

    // Progress
    CardClaimed,
    TierCompleted,
    TierStatusChanged,
};

pub use bus::{EventBus, EventLogEntry};

pub use handlers::register_tier_tracking_handlers;

/// Initialize a new event bus
pub fn create_event_bus() -> EventBus {
    EventBus::new()
}
