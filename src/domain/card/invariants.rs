use super::entity::{CardStub, GeneratedCard};
use crate::domain::{DomainError, DomainResult};

/// Validates all CardStub invariants
pub fn validate_card_stub(card: &CardStub) -> DomainResult<()> {
    if card.ordinal == 0 {
        return Err(DomainError::InvariantViolation(format!(
            "Card ordinals start at 1 (deck '{}', tier {})",
            card.deck_id, card.tier
        )));
    }
    if card.id != CardStub::stable_id(&card.deck_id, card.tier, card.ordinal) {
        return Err(DomainError::InvariantViolation(format!(
            "Card {} does not match its slot {}/{}/{}",
            card.id, card.deck_id, card.tier, card.ordinal
        )));
    }
    validate_title(&card.title)
}

/// Validates a card coming out of the generator
pub fn validate_generated_card(card: &GeneratedCard) -> DomainResult<()> {
    validate_title(&card.title)
}

fn validate_title(title: &str) -> DomainResult<()> {
    if title.trim().is_empty() {
        return Err(DomainError::InvariantViolation(
            "Card title cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Critical Card Invariants:
///
/// 1. Card identity is derived from its slot (deck, tier, ordinal)
/// 2. Ordinals within a tier are contiguous from 1, in generation order
/// 3. Content, once stored, is never replaced
/// 4. A claim references an existing card

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tier::Tier;

    #[test]
    fn test_valid_card() {
        assert!(validate_card_stub(&CardStub::new("biology", Tier::Core, 1, "Cells")).is_ok());
    }

    #[test]
    fn test_forged_id_rejected() {
        let mut card = CardStub::new("biology", Tier::Core, 1, "Cells");
        card.ordinal = 2;
        assert!(validate_card_stub(&card).is_err());
    }

    #[test]
    fn test_blank_title_rejected() {
        assert!(validate_generated_card(&GeneratedCard::new(1, "   ")).is_err());
    }
}
