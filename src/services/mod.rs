// src/services/mod.rs
//
// Services Module - Orchestration Layer

pub mod claim_ledger;
pub mod deck_resolver;
pub mod generation_orchestrator;
pub mod task_registry;
pub mod tier_tracker;

#[cfg(test)]
pub(crate) mod test_support;




// Re-export all services and their types
pub use claim_ledger::ClaimLedger;

pub use deck_resolver::DeckResolver;

pub use generation_orchestrator::{
    GenerationOrchestrator,
    TierSnapshot,
};

pub use task_registry::{
    Registration,
    TaskGuard,
    TaskRegistry,
    TaskState,
    TaskWaiter,
};

pub use tier_tracker::TierTracker;
