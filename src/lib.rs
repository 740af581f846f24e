// src/lib.rs
// DeckForge - Local-first tiered learning deck engine
//
// Architecture:
// - Domain-centric: decks, cards and tier rules live in the domain
// - Event-driven: services coordinate through events
// - Explicit: No implicit behavior, no magic
// - Local-first: every generated card is stored before it is shown
// - Single-flight: one generation per deck and tier, joined by everyone else

// ============================================================================
// FOUNDATION
// ============================================================================

pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod events;
pub mod repositories;
pub mod services;

// ============================================================================
// BOUNDARIES
// ============================================================================

pub mod application;
pub mod integrations;

// ============================================================================
// PUBLIC API - Domain
// ============================================================================

pub use domain::{
    // Deck
    DeckKind,
    DeckNode,
    DeckOrigin,
    DeckRef,
    StaticTaxonomy,
    // Card
    CardStub,
    ClaimOutcome,
    GeneratedCard,
    // Tier
    DeckCompletion,
    Tier,
    TierProgress,
    TierStatus,
};

// ============================================================================
// PUBLIC API - Error Types
// ============================================================================

pub use error::{AppError, AppResult, GenerationError, GenerationResult};

// ============================================================================
// PUBLIC API - Configuration
// ============================================================================

pub use config::EngineConfig;

// ============================================================================
// PUBLIC API - Events
// ============================================================================

pub use events::{
    create_event_bus,
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
    DomainEvent,
    EventBus,
    EventLogEntry,
};

// ============================================================================
// PUBLIC API - Database
// ============================================================================

pub use db::{create_connection_pool, create_memory_pool, initialize_database, ConnectionPool};

// ============================================================================
// PUBLIC API - Integrations
// ============================================================================

pub use integrations::{
    GenerationEvent, GenerationGateway, HierarchySource, HttpGenerationGateway, JsonHierarchy,
    NoTopicProvider, TopicProvider,
};

// ============================================================================
// PUBLIC API - Services
// ============================================================================

pub use services::{ClaimLedger, DeckResolver, GenerationOrchestrator, TierSnapshot, TierTracker};

// ============================================================================
// PUBLIC API - Application Layer
// ============================================================================

pub use application::{DeckEngine, ErrorResponse, UnlockedTier};

// Re-export application submodules
pub use application::dto;
