use std::collections::HashSet;

use super::entity::{DeckNode, DeckRef};
use crate::domain::{DomainError, DomainResult};

/// Validates all DeckNode invariants
pub fn validate_deck_node(node: &DeckNode) -> DomainResult<()> {
    validate_identity(&node.id, &node.name)?;
    validate_parent_path(node)?;
    Ok(())
}

/// Validates a freshly generated child listing before it is persisted
pub fn validate_children(parent: &DeckNode, children: &[DeckRef]) -> DomainResult<()> {
    let mut seen = HashSet::new();
    for child in children {
        validate_identity(&child.id, &child.name)?;
        if child.id == parent.id {
            return Err(DomainError::InvariantViolation(format!(
                "Deck '{}' cannot be its own child",
                parent.id
            )));
        }
        if !seen.insert(child.id.as_str()) {
            return Err(DomainError::InvariantViolation(format!(
                "Duplicate child '{}' under deck '{}'",
                child.id, parent.id
            )));
        }
    }
    Ok(())
}

/// A deck above MIN_LEAF_DEPTH may never be recorded as a leaf
pub fn ensure_leaf_allowed(node: &DeckNode) -> DomainResult<()> {
    if !node.may_be_leaf() {
        return Err(DomainError::AmbiguousLeaf {
            deck_id: node.id.clone(),
            depth: node.depth,
        });
    }
    Ok(())
}

fn validate_identity(id: &str, name: &str) -> DomainResult<()> {
    if id.trim().is_empty() || id.ends_with('/') {
        return Err(DomainError::InvariantViolation(format!(
            "Deck id '{}' is empty or malformed",
            id
        )));
    }
    if name.trim().is_empty() {
        return Err(DomainError::InvariantViolation(format!(
            "Deck '{}' has an empty name",
            id
        )));
    }
    Ok(())
}

/// The root has no path; every other deck lists its ancestors below the root
fn validate_parent_path(node: &DeckNode) -> DomainResult<()> {
    let expected = node.depth.saturating_sub(1) as usize;
    if node.parent_path.len() != expected {
        return Err(DomainError::InvariantViolation(format!(
            "Deck '{}' at depth {} has a parent path of length {}",
            node.id,
            node.depth,
            node.parent_path.len()
        )));
    }
    Ok(())
}

/// Critical Deck Invariants:
///
/// 1. A resolved deck is immutable (id, name, depth, parent path)
/// 2. Children ids are unique under a parent
/// 3. Depth 0..=2 decks are never persisted as leaves
/// 4. Leafness at depth >= 3 is whatever the generator says; deep decks may still branch

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::deck::DeckOrigin;

    fn node(id: &str, depth: u32) -> DeckNode {
        let path = (1..depth).map(|i| format!("Level {}", i)).collect();
        DeckNode::new(id, "Name", depth, path, DeckOrigin::Generated)
    }

    #[test]
    fn test_valid_node() {
        assert!(validate_deck_node(&node("science/physics/optics", 3)).is_ok());
    }

    #[test]
    fn test_parent_path_must_match_depth() {
        let mut broken = node("physics", 2);
        broken.parent_path.clear();
        assert!(validate_deck_node(&broken).is_err());
    }

    #[test]
    fn test_duplicate_children_rejected() {
        let parent = node("physics", 2);
        let children = vec![
            DeckRef::new("physics/optics", "Optics"),
            DeckRef::new("physics/optics", "Optics Again"),
        ];
        assert!(validate_children(&parent, &children).is_err());
    }

    #[test]
    fn test_empty_slug_rejected() {
        let parent = node("physics", 2);
        let children = vec![DeckRef::new("physics/", "???")];
        assert!(validate_children(&parent, &children).is_err());
    }

    #[test]
    fn test_broad_category_cannot_be_leaf() {
        assert!(matches!(
            ensure_leaf_allowed(&node("geography", 2)),
            Err(DomainError::AmbiguousLeaf { depth: 2, .. })
        ));
        assert!(ensure_leaf_allowed(&node("geography/rivers", 3)).is_ok());
    }
}
