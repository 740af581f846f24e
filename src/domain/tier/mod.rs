//! Tier progression rules:
//!
//! 1. Status is DERIVED from card counts, claims and persisted unlock flags
//! 2. Status only moves forward: locked -> unlockable -> unlocked -> complete
//! 3. Completing tier N makes tier N+1 unlockable, never unlocked
//! 4. Only Core unlocks itself (once it has cards); deep dives need an explicit unlock

pub mod entity;
pub mod progression;

pub use entity::{DeckCompletion, Tier, TierCounts, TierProgress, TierStatus};
pub use progression::{check_unlock, derive_status};
