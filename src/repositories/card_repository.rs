// src/repositories/card_repository.rs
//
// Card Repository
//
// Card stubs per (deck, tier), their generated bodies and the markers of
// tiers whose generation ran to completion.
//
// Appends go through an IMMEDIATE transaction: the write lock is taken
// before the next ordinal is read, so concurrent appends to the same tier
// can never produce a gap or a duplicate ordinal.

use crate::db::ConnectionPool;
use crate::domain::{CardStub, Tier};
use crate::error::AppResult;
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row, TransactionBehavior};
use std::sync::Arc;
use uuid::Uuid;

use super::{conversion_error, parse_uuid};

pub struct SqliteCardRepository {
    pool: Arc<ConnectionPool>,
}

impl SqliteCardRepository {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    fn row_to_card(row: &Row) -> rusqlite::Result<CardStub> {
        let id_str: String = row.get("id")?;
        let tier_str: String = row.get("tier")?;
        let ordinal: i64 = row.get("ordinal")?;

        let tier = tier_str.parse::<Tier>().map_err(|e| conversion_error(2, e))?;

        Ok(CardStub {
            id: parse_uuid(0, &id_str)?,
            deck_id: row.get("deck_id")?,
            tier,
            ordinal: ordinal as u32,
            title: row.get("title")?,
        })
    }
}

// ---------------------------------------------------------------------
// Repository contract
// ---------------------------------------------------------------------
pub trait CardRepository: Send + Sync {
    /// Cards of a tier in ordinal order; None when nothing was stored yet
    fn get_tier_cards(&self, deck_id: &str, tier: Tier) -> AppResult<Option<Vec<CardStub>>>;

    /// Append a streamed card at the end of the tier
    fn append_streamed_card(&self, deck_id: &str, tier: Tier, title: &str) -> AppResult<CardStub>;

    fn get_card(&self, card_id: Uuid) -> AppResult<Option<CardStub>>;

    fn count_tier_cards(&self, deck_id: &str, tier: Tier) -> AppResult<u32>;

    fn get_card_content(&self, card_id: Uuid) -> AppResult<Option<String>>;

    /// Stores a body once; later writes for the same card are ignored
    fn set_card_content(&self, card_id: Uuid, body: &str) -> AppResult<()>;

    fn mark_tier_generated(&self, deck_id: &str, tier: Tier, card_count: u32) -> AppResult<()>;

    fn is_tier_generated(&self, deck_id: &str, tier: Tier) -> AppResult<bool>;
}

// ---------------------------------------------------------------------
// SQLite Implementation
// ---------------------------------------------------------------------
impl CardRepository for SqliteCardRepository {
    fn get_tier_cards(&self, deck_id: &str, tier: Tier) -> AppResult<Option<Vec<CardStub>>> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(
            "SELECT id, deck_id, tier, ordinal, title FROM tier_cards
             WHERE deck_id = ?1 AND tier = ?2
             ORDER BY ordinal ASC",
        )?;

        let cards = stmt
            .query_map(params![deck_id, tier.as_str()], Self::row_to_card)?
            .collect::<Result<Vec<_>, _>>()?;

        if cards.is_empty() {
            Ok(None)
        } else {
            Ok(Some(cards))
        }
    }

    fn append_streamed_card(&self, deck_id: &str, tier: Tier, title: &str) -> AppResult<CardStub> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let last_ordinal: i64 = tx.query_row(
            "SELECT COALESCE(MAX(ordinal), 0) FROM tier_cards WHERE deck_id = ?1 AND tier = ?2",
            params![deck_id, tier.as_str()],
            |row| row.get(0),
        )?;

        let card = CardStub::new(deck_id, tier, last_ordinal as u32 + 1, title);

        tx.execute(
            "INSERT INTO tier_cards (id, deck_id, tier, ordinal, title, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                card.id.to_string(),
                card.deck_id,
                card.tier.as_str(),
                card.ordinal as i64,
                card.title,
                Utc::now().to_rfc3339(),
            ],
        )?;

        tx.commit()?;
        Ok(card)
    }

    fn get_card(&self, card_id: Uuid) -> AppResult<Option<CardStub>> {
        let conn = self.pool.get()?;

        let card = conn
            .query_row(
                "SELECT id, deck_id, tier, ordinal, title FROM tier_cards WHERE id = ?1",
                params![card_id.to_string()],
                Self::row_to_card,
            )
            .optional()?;

        Ok(card)
    }

    fn count_tier_cards(&self, deck_id: &str, tier: Tier) -> AppResult<u32> {
        let conn = self.pool.get()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM tier_cards WHERE deck_id = ?1 AND tier = ?2",
            params![deck_id, tier.as_str()],
            |row| row.get(0),
        )?;

        Ok(count as u32)
    }

    fn get_card_content(&self, card_id: Uuid) -> AppResult<Option<String>> {
        let conn = self.pool.get()?;

        let body = conn
            .query_row(
                "SELECT body FROM card_content WHERE card_id = ?1",
                params![card_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        Ok(body)
    }

    fn set_card_content(&self, card_id: Uuid, body: &str) -> AppResult<()> {
        let conn = self.pool.get()?;

        conn.execute(
            "INSERT OR IGNORE INTO card_content (card_id, body, created_at) VALUES (?1, ?2, ?3)",
            params![card_id.to_string(), body, Utc::now().to_rfc3339()],
        )?;

        Ok(())
    }

    fn mark_tier_generated(&self, deck_id: &str, tier: Tier, card_count: u32) -> AppResult<()> {
        let conn = self.pool.get()?;

        conn.execute(
            "INSERT OR REPLACE INTO tier_generations (deck_id, tier, card_count, generated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![deck_id, tier.as_str(), card_count as i64, Utc::now().to_rfc3339()],
        )?;

        Ok(())
    }

    fn is_tier_generated(&self, deck_id: &str, tier: Tier) -> AppResult<bool> {
        let conn = self.pool.get()?;

        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM tier_generations WHERE deck_id = ?1 AND tier = ?2)",
            params![deck_id, tier.as_str()],
            |row| row.get(0),
        )?;

        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_memory_pool;

    fn repository() -> SqliteCardRepository {
        SqliteCardRepository::new(Arc::new(create_memory_pool().unwrap()))
    }

    #[test]
    fn test_empty_tier_is_none() {
        let repo = repository();
        assert_eq!(repo.get_tier_cards("biology", Tier::Core).unwrap(), None);
        assert_eq!(repo.count_tier_cards("biology", Tier::Core).unwrap(), 0);
    }

    #[test]
    fn test_append_assigns_contiguous_ordinals() {
        let repo = repository();
        for title in ["A", "B", "C"] {
            repo.append_streamed_card("biology", Tier::Core, title).unwrap();
        }
        repo.append_streamed_card("biology", Tier::DeepDive1, "X").unwrap();

        let cards = repo.get_tier_cards("biology", Tier::Core).unwrap().unwrap();
        let ordinals: Vec<u32> = cards.iter().map(|c| c.ordinal).collect();
        let titles: Vec<&str> = cards.iter().map(|c| c.title.as_str()).collect();

        assert_eq!(ordinals, vec![1, 2, 3]);
        assert_eq!(titles, vec!["A", "B", "C"]);
        assert_eq!(cards[0].id, CardStub::stable_id("biology", Tier::Core, 1));
        assert_eq!(repo.count_tier_cards("biology", Tier::DeepDive1).unwrap(), 1);
    }

    #[test]
    fn test_get_card_by_id() {
        let repo = repository();
        let card = repo.append_streamed_card("biology", Tier::Core, "Cells").unwrap();

        assert_eq!(repo.get_card(card.id).unwrap(), Some(card));
        assert_eq!(repo.get_card(Uuid::new_v4()).unwrap(), None);
    }

    #[test]
    fn test_content_is_written_once() {
        let repo = repository();
        let card = repo.append_streamed_card("biology", Tier::Core, "Cells").unwrap();

        assert_eq!(repo.get_card_content(card.id).unwrap(), None);
        repo.set_card_content(card.id, "first").unwrap();
        repo.set_card_content(card.id, "second").unwrap();

        assert_eq!(repo.get_card_content(card.id).unwrap().as_deref(), Some("first"));
    }

    #[test]
    fn test_tier_generated_marker() {
        let repo = repository();
        assert!(!repo.is_tier_generated("biology", Tier::Core).unwrap());

        repo.mark_tier_generated("biology", Tier::Core, 5).unwrap();

        assert!(repo.is_tier_generated("biology", Tier::Core).unwrap());
        assert!(!repo.is_tier_generated("biology", Tier::DeepDive1).unwrap());
    }

    #[test]
    fn test_concurrent_appends_never_collide() {
        let dir = tempfile::tempdir().unwrap();
        let pool = Arc::new(crate::db::create_connection_pool(&dir.path().join("cards.db")).unwrap());
        let repo = Arc::new(SqliteCardRepository::new(pool));

        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let repo = Arc::clone(&repo);
                std::thread::spawn(move || {
                    for i in 0..5 {
                        repo.append_streamed_card("biology", Tier::Core, &format!("{}-{}", worker, i))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let cards = repo.get_tier_cards("biology", Tier::Core).unwrap().unwrap();
        let ordinals: Vec<u32> = cards.iter().map(|c| c.ordinal).collect();
        assert_eq!(ordinals, (1..=20).collect::<Vec<u32>>());
    }
}
