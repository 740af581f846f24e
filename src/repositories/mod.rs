// src/repositories/mod.rs
//
// Repository layer
//
// CRITICAL RULES:
// - Repositories are DUMB data mappers
// - NO business logic
// - NO invariant enforcement
// - NO event emission
// - NO cross-repository calls
// - Explicit SQL only

pub mod card_repository;
pub mod claim_repository;
pub mod deck_repository;
pub mod tier_state_repository;

pub use card_repository::{CardRepository, SqliteCardRepository};
pub use claim_repository::{ClaimRepository, SqliteClaimRepository};
pub use deck_repository::{DeckRepository, SqliteDeckRepository};
pub use tier_state_repository::{SqliteTierStateRepository, TierStateRepository};

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Column conversion failure with a readable message
pub(crate) fn conversion_error(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        column,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, message)),
    )
}

pub(crate) fn parse_uuid(column: usize, value: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| conversion_error(column, format!("Invalid UUID '{}': {}", value, e)))
}

pub(crate) fn parse_timestamp(column: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(column, format!("Invalid timestamp '{}': {}", value, e)))
}
