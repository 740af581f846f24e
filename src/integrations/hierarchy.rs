// src/integrations/hierarchy.rs
//
// Pre-built deck hierarchy
//
// A JSON file extends the static taxonomy below depth 2. Each top-level
// entry names the existing deck it hangs under:
//
//   { "branches": [
//       { "parent": "biology",
//         "id": "biology/genetics", "name": "Genetics",
//         "children": [ { "id": "biology/genetics/dna", "name": "DNA", "leaf": true } ] }
//   ] }

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::domain::{DeckNode, DeckOrigin, DeckRef, StaticTaxonomy, StoredChildren};
use crate::error::AppResult;

/// What the hierarchy knows about one deck
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyEntry {
    pub node: DeckNode,
    /// None when the hierarchy lists the deck but not its children
    pub children: Option<StoredChildren>,
}

pub trait HierarchySource: Send + Sync {
    fn lookup(&self, deck_id: &str) -> Option<HierarchyEntry>;
}

#[derive(Debug, Deserialize)]
struct HierarchyFile {
    #[serde(default)]
    branches: Vec<Branch>,
}

#[derive(Debug, Deserialize)]
struct Branch {
    parent: String,
    #[serde(flatten)]
    node: HierarchyNode,
}

#[derive(Debug, Deserialize)]
struct HierarchyNode {
    id: String,
    name: String,
    #[serde(default)]
    leaf: bool,
    #[serde(default)]
    children: Vec<HierarchyNode>,
}

/// Hierarchy loaded from a JSON file
#[derive(Debug, Clone, Default)]
pub struct JsonHierarchy {
    entries: HashMap<String, HierarchyEntry>,
}

impl JsonHierarchy {
    pub fn from_file(path: &Path, taxonomy: &StaticTaxonomy) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let hierarchy = Self::from_json(&content, taxonomy)?;
        log::info!(
            "Loaded {} hierarchy decks from {}",
            hierarchy.len(),
            path.display()
        );
        Ok(hierarchy)
    }

    pub fn from_json(content: &str, taxonomy: &StaticTaxonomy) -> AppResult<Self> {
        let file: HierarchyFile = serde_json::from_str(content)?;
        let mut hierarchy = Self::default();

        for branch in file.branches {
            let Some(parent) = taxonomy.node(&branch.parent) else {
                log::warn!(
                    "Hierarchy branch '{}' hangs under unknown deck '{}', skipped",
                    branch.node.id,
                    branch.parent
                );
                continue;
            };
            hierarchy.insert(parent, branch.node);
        }

        Ok(hierarchy)
    }

    fn insert(&mut self, parent: &DeckNode, raw: HierarchyNode) {
        let node = parent.child(&DeckRef::new(&raw.id, &raw.name), DeckOrigin::Hierarchy);

        let children = if !raw.children.is_empty() {
            Some(StoredChildren::Children(
                raw.children
                    .iter()
                    .map(|c| DeckRef::new(&c.id, &c.name))
                    .collect(),
            ))
        } else if raw.leaf && node.may_be_leaf() {
            Some(StoredChildren::Leaf)
        } else {
            if raw.leaf {
                log::warn!(
                    "Hierarchy marks '{}' as a leaf at depth {}, ignored",
                    node.id,
                    node.depth
                );
            }
            None
        };

        for child in raw.children {
            self.insert(&node, child);
        }

        self.entries
            .insert(node.id.clone(), HierarchyEntry { node, children });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl HierarchySource for JsonHierarchy {
    fn lookup(&self, deck_id: &str) -> Option<HierarchyEntry> {
        self.entries.get(deck_id).cloned()
    }
}
