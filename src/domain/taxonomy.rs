// src/domain/taxonomy.rs
//
// Hardcoded top of the deck tree: the root, the domains (depth 1) and their
// broad categories (depth 2). Everything below depth 2 comes from the
// pre-built hierarchy or from generation.

use std::collections::HashMap;

use super::deck::{DeckNode, DeckOrigin, DeckRef};

pub const ROOT_DECK_ID: &str = "all";
const ROOT_DECK_NAME: &str = "All Topics";

const DOMAINS: &[(&str, &str, &[(&str, &str)])] = &[
    (
        "science",
        "Science",
        &[
            ("physics", "Physics"),
            ("chemistry", "Chemistry"),
            ("biology", "Biology"),
            ("astronomy", "Astronomy"),
            ("mathematics", "Mathematics"),
        ],
    ),
    (
        "humanities",
        "Humanities",
        &[
            ("history", "History"),
            ("philosophy", "Philosophy"),
            ("religion", "Religion"),
            ("literature", "Literature"),
            ("languages", "Languages"),
        ],
    ),
    (
        "society",
        "Society",
        &[
            ("geography", "Geography"),
            ("economics", "Economics"),
            ("politics", "Politics"),
            ("psychology", "Psychology"),
            ("law", "Law"),
        ],
    ),
    (
        "arts",
        "Arts",
        &[
            ("music", "Music"),
            ("visual-arts", "Visual Arts"),
            ("film", "Film"),
            ("architecture", "Architecture"),
        ],
    ),
    (
        "technology",
        "Technology",
        &[
            ("computing", "Computing"),
            ("engineering", "Engineering"),
            ("medicine", "Medicine"),
            ("transportation", "Transportation"),
        ],
    ),
];

#[derive(Debug, Clone)]
struct TaxonomyEntry {
    node: DeckNode,
    /// None for broad categories: their children are discovered later
    children: Option<Vec<DeckRef>>,
}

/// The static part of the deck tree
#[derive(Debug, Clone)]
pub struct StaticTaxonomy {
    entries: HashMap<String, TaxonomyEntry>,
}

impl StaticTaxonomy {
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        let root = DeckNode::new(ROOT_DECK_ID, ROOT_DECK_NAME, 0, Vec::new(), DeckOrigin::Taxonomy);

        let mut domain_refs = Vec::new();
        for (domain_id, domain_name, categories) in DOMAINS {
            let domain_ref = DeckRef::new(*domain_id, *domain_name);
            let domain = root.child(&domain_ref, DeckOrigin::Taxonomy);

            let category_refs: Vec<DeckRef> = categories
                .iter()
                .map(|(id, name)| DeckRef::new(*id, *name))
                .collect();

            for category_ref in &category_refs {
                entries.insert(
                    category_ref.id.clone(),
                    TaxonomyEntry {
                        node: domain.child(category_ref, DeckOrigin::Taxonomy),
                        children: None,
                    },
                );
            }

            entries.insert(
                domain.id.clone(),
                TaxonomyEntry {
                    node: domain,
                    children: Some(category_refs),
                },
            );
            domain_refs.push(domain_ref);
        }

        entries.insert(
            root.id.clone(),
            TaxonomyEntry {
                node: root,
                children: Some(domain_refs),
            },
        );

        Self { entries }
    }

    pub fn node(&self, deck_id: &str) -> Option<&DeckNode> {
        self.entries.get(deck_id).map(|entry| &entry.node)
    }

    /// Children fixed by the taxonomy, if any
    pub fn children(&self, deck_id: &str) -> Option<&[DeckRef]> {
        self.entries
            .get(deck_id)
            .and_then(|entry| entry.children.as_deref())
    }

    pub fn contains(&self, deck_id: &str) -> bool {
        self.entries.contains_key(deck_id)
    }
}

impl Default for StaticTaxonomy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::deck::validate_deck_node;

    #[test]
    fn test_depths() {
        let taxonomy = StaticTaxonomy::new();
        assert_eq!(taxonomy.node(ROOT_DECK_ID).unwrap().depth, 0);
        assert_eq!(taxonomy.node("science").unwrap().depth, 1);
        assert_eq!(taxonomy.node("biology").unwrap().depth, 2);
        assert_eq!(taxonomy.node("geography").unwrap().depth, 2);
    }

    #[test]
    fn test_broad_categories_have_open_children() {
        let taxonomy = StaticTaxonomy::new();
        assert!(taxonomy.children("science").unwrap().iter().any(|c| c.id == "biology"));
        assert!(taxonomy.children("biology").is_none());
        assert!(taxonomy.children("nonexistent").is_none());
    }

    #[test]
    fn test_all_nodes_are_valid() {
        let taxonomy = StaticTaxonomy::new();
        for entry in taxonomy.entries.values() {
            validate_deck_node(&entry.node).unwrap();
        }
    }

    #[test]
    fn test_domain_name() {
        let taxonomy = StaticTaxonomy::new();
        assert_eq!(taxonomy.node("biology").unwrap().domain_name(), Some("Science"));
        assert_eq!(taxonomy.node("society").unwrap().domain_name(), Some("Society"));
        assert_eq!(taxonomy.node(ROOT_DECK_ID).unwrap().domain_name(), None);
    }
}
