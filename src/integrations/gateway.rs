// src/integrations/gateway.rs
//
// Generation Gateway - boundary to the external generative text service
//
// CRITICAL RULES:
// - The gateway only fetches; it never touches the store
// - Tier generation is exposed as an ordered stream of events
// - Every failure is a typed GenerationError

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::domain::{DeckRef, GeneratedCard, Tier};
use crate::error::{GenerationError, GenerationResult};

/// Receiving half of a tier generation
pub type CardStream = mpsc::Receiver<GenerationEvent>;

/// Sending half, held by whoever produces the cards
pub type CardSender = mpsc::Sender<GenerationEvent>;

const STREAM_CAPACITY: usize = 32;

/// One step of a tier generation, in generation order.
/// A stream ends with exactly one `Completed` or `Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationEvent {
    CardArrived(GeneratedCard),
    Completed,
    Failed(GenerationError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubDeckRequest {
    pub deck_name: String,
    pub parent_path: Vec<String>,
    pub depth: u32,
    /// Top-level domain of the deck, steers the shape of the listing
    pub archetype_hint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubDeckListing {
    Decks(Vec<DeckRef>),
    Leaf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierRequest {
    pub deck_name: String,
    pub tier: Tier,
    /// Titles of every card in the earlier tiers, so the new tier goes deeper
    pub previous_cards: Vec<String>,
    pub parent_path: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardBodyRequest {
    pub deck_name: String,
    pub card_number: u32,
    pub title: String,
    /// Titles of all known cards of the deck
    pub known_cards: Vec<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerationGateway: Send + Sync {
    async fn list_sub_decks(&self, request: SubDeckRequest) -> GenerationResult<SubDeckListing>;

    /// Start generating a tier. Errors returned here mean nothing was
    /// generated; errors after that arrive on the stream.
    async fn generate_tier(&self, request: TierRequest) -> GenerationResult<CardStream>;

    async fn generate_card_body(&self, request: CardBodyRequest) -> GenerationResult<String>;
}

pub fn card_stream() -> (CardSender, CardStream) {
    mpsc::channel(STREAM_CAPACITY)
}

/// A stream that yields the given cards and completes
pub fn stream_from_cards(cards: Vec<GeneratedCard>) -> CardStream {
    let (tx, rx) = mpsc::channel(cards.len() + 1);
    for card in cards {
        // capacity covers every event
        let _ = tx.try_send(GenerationEvent::CardArrived(card));
    }
    let _ = tx.try_send(GenerationEvent::Completed);
    rx
}

/// Drain a stream into the full card list, in stream order
pub async fn collect_stream(mut stream: CardStream) -> GenerationResult<Vec<GeneratedCard>> {
    let mut cards = Vec::new();
    while let Some(event) = stream.recv().await {
        match event {
            GenerationEvent::CardArrived(card) => cards.push(card),
            GenerationEvent::Completed => return Ok(cards),
            GenerationEvent::Failed(e) => return Err(e),
        }
    }
    Err(GenerationError::Interrupted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_collect_preserves_order() {
        let cards: Vec<GeneratedCard> = (1..=5)
            .map(|n| GeneratedCard::new(n, format!("Card {}", n)))
            .collect();

        let collected = collect_stream(stream_from_cards(cards.clone())).await.unwrap();

        assert_eq!(collected, cards);
    }

    #[tokio::test]
    async fn test_stream_without_terminal_event_is_interrupted() {
        let (tx, rx) = card_stream();
        tx.send(GenerationEvent::CardArrived(GeneratedCard::new(1, "A")))
            .await
            .unwrap();
        drop(tx);

        assert_eq!(collect_stream(rx).await, Err(GenerationError::Interrupted));
    }

    #[tokio::test]
    async fn test_failure_event_surfaces() {
        let (tx, rx) = card_stream();
        tx.send(GenerationEvent::Failed(GenerationError::Service("overloaded".into())))
            .await
            .unwrap();

        assert_eq!(
            collect_stream(rx).await,
            Err(GenerationError::Service("overloaded".into()))
        );
    }
}
