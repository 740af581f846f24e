pub mod entity;
pub mod invariants;

pub use entity::{CardContent, CardStub, ClaimOutcome, ClaimRecord, GeneratedCard};
pub use invariants::{validate_card_stub, validate_generated_card};
