pub mod entity;
pub mod invariants;

pub use entity::{child_id, DeckKind, DeckNode, DeckOrigin, DeckRef, StoredChildren, MIN_LEAF_DEPTH};
pub use invariants::{ensure_leaf_allowed, validate_children, validate_deck_node};
