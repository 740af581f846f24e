// src/application/dto/mod.rs
//
// Data Transfer Objects
//
// CRITICAL PRINCIPLES:
// - DTOs are caller-friendly representations
// - DTOs NEVER leak domain invariants
// - DTOs are simple, serializable structs
// - Conversion FROM domain entities only (never TO)

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::domain::{CardStub, DeckKind, DeckNode, DeckRef};
use crate::services::TierSnapshot;

// ============================================================================
// DECK DTOs
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckDto {
    pub id: String,
    pub name: String,
    pub depth: u32,
    pub parent_path: Vec<String>,
    pub origin: String,
    /// "category", "article" or "unresolved"
    pub kind: String,
    pub children: Vec<DeckRefDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckRefDto {
    pub id: String,
    pub name: String,
}

impl DeckDto {
    pub fn from_node(node: &DeckNode, kind: &DeckKind) -> Self {
        let kind_name = match kind {
            DeckKind::Category(_) => "category",
            DeckKind::Article => "article",
            DeckKind::Unresolved => "unresolved",
        };

        Self {
            id: node.id.clone(),
            name: node.name.clone(),
            depth: node.depth,
            parent_path: node.parent_path.clone(),
            origin: node.origin.to_string(),
            kind: kind_name.to_string(),
            children: kind.children().iter().map(DeckRefDto::from).collect(),
        }
    }
}

impl From<&DeckRef> for DeckRefDto {
    fn from(deck: &DeckRef) -> Self {
        Self {
            id: deck.id.clone(),
            name: deck.name.clone(),
        }
    }
}

// ============================================================================
// CARD / TIER DTOs
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardDto {
    pub id: String,
    pub number: u32,
    pub title: String,
    pub claimed: bool,
}

impl CardDto {
    pub fn from_stub(card: &CardStub, claimed: bool) -> Self {
        Self {
            id: card.id.to_string(),
            number: card.ordinal,
            title: card.title.clone(),
            claimed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierDto {
    pub deck_id: String,
    pub tier: String,
    pub generating: bool,
    pub generated: bool,
    pub cards: Vec<CardDto>,
}

impl TierDto {
    pub fn from_snapshot(snapshot: &TierSnapshot, claimed: &HashSet<Uuid>) -> Self {
        Self {
            deck_id: snapshot.deck_id.clone(),
            tier: snapshot.tier.to_string(),
            generating: snapshot.generating,
            generated: snapshot.generated,
            cards: snapshot
                .cards
                .iter()
                .map(|card| CardDto::from_stub(card, claimed.contains(&card.id)))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardBodyDto {
    pub card_id: String,
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DeckOrigin, Tier};

    #[test]
    fn test_deck_dto_kind() {
        let node = DeckNode::new("biology", "Biology", 2, vec!["Science".into()], DeckOrigin::Taxonomy);
        let kind = DeckKind::Category(vec![DeckRef::new("biology/genetics", "Genetics")]);

        let dto = DeckDto::from_node(&node, &kind);

        assert_eq!(dto.kind, "category");
        assert_eq!(dto.origin, "taxonomy");
        assert_eq!(dto.children.len(), 1);
        assert_eq!(DeckDto::from_node(&node, &DeckKind::Unresolved).kind, "unresolved");
    }

    #[test]
    fn test_tier_dto_marks_claimed_cards() {
        let cards = vec![
            CardStub::new("biology", Tier::Core, 1, "A"),
            CardStub::new("biology", Tier::Core, 2, "B"),
        ];
        let claimed: HashSet<Uuid> = [cards[1].id].into_iter().collect();
        let snapshot = TierSnapshot {
            deck_id: "biology".into(),
            tier: Tier::Core,
            cards,
            generating: false,
            generated: true,
        };

        let dto = TierDto::from_snapshot(&snapshot, &claimed);

        assert_eq!(dto.tier, "core");
        assert!(!dto.cards[0].claimed);
        assert!(dto.cards[1].claimed);
    }
}
