use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::tier::Tier;

/// Namespace for deterministic card ids
const CARD_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a4e_9b7d_4c30_8e21_5d0a_b3f4_c9e7);

/// One card's identity and title within a tier
/// (deck_id, tier, ordinal) is unique and never changes once stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardStub {
    pub id: Uuid,
    pub deck_id: String,
    pub tier: Tier,
    /// 1-based position within the tier, in generation order
    pub ordinal: u32,
    pub title: String,
}

/// A card as produced by the generator, before the store assigns its identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedCard {
    pub number: u32,
    pub title: String,
    #[serde(default, alias = "content")]
    pub body: Option<String>,
}

/// Generated body text for a card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardContent {
    pub card_id: Uuid,
    pub body: String,
}

/// Fact that the user claimed a card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRecord {
    pub card_id: Uuid,
    pub claimed_at: DateTime<Utc>,
}

/// Result of a claim request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimOutcome {
    Claimed,
    AlreadyClaimed,
}

impl CardStub {
    pub fn new(deck_id: impl Into<String>, tier: Tier, ordinal: u32, title: impl Into<String>) -> Self {
        let deck_id = deck_id.into();
        Self {
            id: Self::stable_id(&deck_id, tier, ordinal),
            deck_id,
            tier,
            ordinal,
            title: title.into(),
        }
    }

    /// Deterministic id: the same slot always maps to the same card id,
    /// across restarts and across devices.
    pub fn stable_id(deck_id: &str, tier: Tier, ordinal: u32) -> Uuid {
        let name = format!("{}/{}/{}", deck_id, tier.as_str(), ordinal);
        Uuid::new_v5(&CARD_NAMESPACE, name.as_bytes())
    }
}

impl GeneratedCard {
    pub fn new(number: u32, title: impl Into<String>) -> Self {
        Self {
            number,
            title: title.into(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

impl ClaimOutcome {
    pub fn is_new(&self) -> bool {
        matches!(self, ClaimOutcome::Claimed)
    }
}
