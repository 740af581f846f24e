// src/repositories/tier_state_repository.rs
//
// Persisted tier status. A missing row means the tier never left its
// initial status.

use crate::db::ConnectionPool;
use crate::domain::{Tier, TierStatus};
use crate::error::AppResult;
use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use std::sync::Arc;

use super::conversion_error;

pub struct SqliteTierStateRepository {
    pool: Arc<ConnectionPool>,
}

impl SqliteTierStateRepository {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }
}

pub trait TierStateRepository: Send + Sync {
    fn get_status(&self, deck_id: &str, tier: Tier) -> AppResult<Option<TierStatus>>;

    fn set_status(&self, deck_id: &str, tier: Tier, status: TierStatus) -> AppResult<()>;
}

impl TierStateRepository for SqliteTierStateRepository {
    fn get_status(&self, deck_id: &str, tier: Tier) -> AppResult<Option<TierStatus>> {
        let conn = self.pool.get()?;

        let status = conn
            .query_row(
                "SELECT status FROM tier_state WHERE deck_id = ?1 AND tier = ?2",
                params![deck_id, tier.as_str()],
                |row| {
                    let status_str: String = row.get(0)?;
                    status_str
                        .parse::<TierStatus>()
                        .map_err(|e| conversion_error(0, e))
                },
            )
            .optional()?;

        Ok(status)
    }

    fn set_status(&self, deck_id: &str, tier: Tier, status: TierStatus) -> AppResult<()> {
        let conn = self.pool.get()?;

        conn.execute(
            "INSERT INTO tier_state (deck_id, tier, status, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(deck_id, tier) DO UPDATE SET status = excluded.status, updated_at = excluded.updated_at",
            params![deck_id, tier.as_str(), status.as_str(), Utc::now().to_rfc3339()],
        )?;

        Ok(())
    }
}
