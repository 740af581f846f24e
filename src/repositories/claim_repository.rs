// src/repositories/claim_repository.rs
//
// Claim Repository
//
// Append-only set of claimed card ids.

use crate::db::ConnectionPool;
use crate::domain::{ClaimRecord, Tier};
use crate::error::AppResult;
use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use super::{parse_timestamp, parse_uuid};

pub struct SqliteClaimRepository {
    pool: Arc<ConnectionPool>,
}

impl SqliteClaimRepository {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------
// Repository contract
// ---------------------------------------------------------------------
pub trait ClaimRepository: Send + Sync {
    fn is_claimed(&self, card_id: Uuid) -> AppResult<bool>;

    /// Returns true if the claim was new
    fn claim(&self, card_id: Uuid) -> AppResult<bool>;

    fn get_claim(&self, card_id: Uuid) -> AppResult<Option<ClaimRecord>>;

    fn claimed_ids(&self) -> AppResult<HashSet<Uuid>>;

    fn count_claimed_in_tier(&self, deck_id: &str, tier: Tier) -> AppResult<u32>;
}

// ---------------------------------------------------------------------
// SQLite Implementation
// ---------------------------------------------------------------------
impl ClaimRepository for SqliteClaimRepository {
    fn is_claimed(&self, card_id: Uuid) -> AppResult<bool> {
        let conn = self.pool.get()?;

        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM claims WHERE card_id = ?1)",
            params![card_id.to_string()],
            |row| row.get(0),
        )?;

        Ok(exists)
    }

    fn claim(&self, card_id: Uuid) -> AppResult<bool> {
        let conn = self.pool.get()?;

        let inserted = conn.execute(
            "INSERT OR IGNORE INTO claims (card_id, claimed_at) VALUES (?1, ?2)",
            params![card_id.to_string(), Utc::now().to_rfc3339()],
        )?;

        Ok(inserted == 1)
    }

    fn get_claim(&self, card_id: Uuid) -> AppResult<Option<ClaimRecord>> {
        let conn = self.pool.get()?;

        let record = conn
            .query_row(
                "SELECT card_id, claimed_at FROM claims WHERE card_id = ?1",
                params![card_id.to_string()],
                |row| {
                    let id_str: String = row.get(0)?;
                    let claimed_at_str: String = row.get(1)?;
                    Ok(ClaimRecord {
                        card_id: parse_uuid(0, &id_str)?,
                        claimed_at: parse_timestamp(1, &claimed_at_str)?,
                    })
                },
            )
            .optional()?;

        Ok(record)
    }

    fn claimed_ids(&self) -> AppResult<HashSet<Uuid>> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare("SELECT card_id FROM claims")?;
        let ids = stmt
            .query_map([], |row| {
                let id_str: String = row.get(0)?;
                parse_uuid(0, &id_str)
            })?
            .collect::<Result<HashSet<_>, _>>()?;

        Ok(ids)
    }

    fn count_claimed_in_tier(&self, deck_id: &str, tier: Tier) -> AppResult<u32> {
        let conn = self.pool.get()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM claims c
             JOIN tier_cards t ON t.id = c.card_id
             WHERE t.deck_id = ?1 AND t.tier = ?2",
            params![deck_id, tier.as_str()],
            |row| row.get(0),
        )?;

        Ok(count as u32)
    }
}
