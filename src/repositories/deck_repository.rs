// src/repositories/deck_repository.rs
//
// Deck Repository
//
// Stores resolvable deck nodes and the resolved child listing of each deck.
// A deck without a deck_children row is unresolved.

use crate::db::ConnectionPool;
use crate::domain::{DeckNode, DeckOrigin, DeckRef, StoredChildren};
use crate::error::AppResult;
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row, Transaction};
use std::sync::Arc;

use super::conversion_error;

pub struct SqliteDeckRepository {
    pool: Arc<ConnectionPool>,
}

impl SqliteDeckRepository {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    fn row_to_node(row: &Row) -> rusqlite::Result<DeckNode> {
        let depth: i64 = row.get("depth")?;
        let parent_path_json: String = row.get("parent_path")?;
        let origin_str: String = row.get("origin")?;

        let parent_path: Vec<String> = serde_json::from_str(&parent_path_json).map_err(|e| {
            conversion_error(3, format!("Invalid parent path '{}': {}", parent_path_json, e))
        })?;

        let origin = origin_str
            .parse::<DeckOrigin>()
            .map_err(|e| conversion_error(4, e))?;

        Ok(DeckNode {
            id: row.get("id")?,
            name: row.get("name")?,
            depth: depth as u32,
            parent_path,
            origin,
        })
    }

    fn insert_node(tx: &Transaction, node: &DeckNode) -> AppResult<()> {
        tx.execute(
            "INSERT OR IGNORE INTO deck_nodes (id, name, depth, parent_path, origin, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                node.id,
                node.name,
                node.depth as i64,
                serde_json::to_string(&node.parent_path)?,
                node.origin.to_string(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

// ---------------------------------------------------------------------
// Repository contract
// ---------------------------------------------------------------------
pub trait DeckRepository: Send + Sync {
    fn get_node(&self, deck_id: &str) -> AppResult<Option<DeckNode>>;

    fn save_node(&self, node: &DeckNode) -> AppResult<()>;

    /// None while the deck is unresolved
    fn get_children(&self, deck_id: &str) -> AppResult<Option<StoredChildren>>;

    /// Store the child listing of `parent` together with the child nodes,
    /// in one transaction.
    fn set_children(
        &self,
        parent: &DeckNode,
        children: &StoredChildren,
        child_nodes: &[DeckNode],
    ) -> AppResult<()>;
}

// ---------------------------------------------------------------------
// SQLite Implementation
// ---------------------------------------------------------------------
impl DeckRepository for SqliteDeckRepository {
    fn get_node(&self, deck_id: &str) -> AppResult<Option<DeckNode>> {
        let conn = self.pool.get()?;

        let node = conn
            .query_row(
                "SELECT id, name, depth, parent_path, origin FROM deck_nodes WHERE id = ?1",
                params![deck_id],
                Self::row_to_node,
            )
            .optional()?;

        Ok(node)
    }

    fn save_node(&self, node: &DeckNode) -> AppResult<()> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        Self::insert_node(&tx, node)?;
        tx.commit()?;
        Ok(())
    }

    fn get_children(&self, deck_id: &str) -> AppResult<Option<StoredChildren>> {
        let conn = self.pool.get()?;

        let row: Option<(bool, String)> = conn
            .query_row(
                "SELECT is_leaf, children FROM deck_children WHERE deck_id = ?1",
                params![deck_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            None => Ok(None),
            Some((true, _)) => Ok(Some(StoredChildren::Leaf)),
            Some((false, json)) => {
                let children: Vec<DeckRef> = serde_json::from_str(&json)?;
                Ok(Some(StoredChildren::Children(children)))
            }
        }
    }

    fn set_children(
        &self,
        parent: &DeckNode,
        children: &StoredChildren,
        child_nodes: &[DeckNode],
    ) -> AppResult<()> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;

        Self::insert_node(&tx, parent)?;
        for node in child_nodes {
            Self::insert_node(&tx, node)?;
        }

        let (is_leaf, json) = match children {
            StoredChildren::Leaf => (true, "[]".to_string()),
            StoredChildren::Children(list) => (false, serde_json::to_string(list)?),
        };

        tx.execute(
            "INSERT OR REPLACE INTO deck_children (deck_id, is_leaf, children, resolved_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![parent.id, is_leaf, json, Utc::now().to_rfc3339()],
        )?;

        tx.commit()?;
        Ok(())
    }
}
