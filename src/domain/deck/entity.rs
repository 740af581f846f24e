use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use uuid::Uuid;

/// Shallowest depth at which a deck may legitimately have no children.
/// Depth 0 is the root, depth 1 a domain, depth 2 a broad category.
pub const MIN_LEAF_DEPTH: u32 = 3;

/// A topic in the deck hierarchy
/// Immutable once resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckNode {
    /// Stable identifier ("biology", "biology/cell-biology")
    pub id: String,

    /// Display name
    pub name: String,

    /// Distance from the root deck
    pub depth: u32,

    /// Names of the ancestors below the root, outermost first
    pub parent_path: Vec<String>,

    /// Where this node was resolved from
    pub origin: DeckOrigin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeckOrigin {
    Taxonomy,
    Hierarchy,
    Generated,
}

/// Lightweight reference to a child deck
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeckRef {
    pub id: String,
    pub name: String,
}

/// What is known about a deck's children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "children", rename_all = "snake_case")]
pub enum DeckKind {
    /// Has children (possibly discovered lazily)
    Category(Vec<DeckRef>),
    /// Leaf deck carrying learning cards
    Article,
    /// Children not generated yet, or the last attempt was discarded
    Unresolved,
}

/// Children as persisted by the store. There is no persisted "unresolved":
/// an unresolved deck simply has no row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoredChildren {
    Leaf,
    Children(Vec<DeckRef>),
}

impl DeckNode {
    pub fn new(id: impl Into<String>, name: impl Into<String>, depth: u32, parent_path: Vec<String>, origin: DeckOrigin) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            depth,
            parent_path,
            origin,
        }
    }

    /// Build the node for a child of this deck
    pub fn child(&self, child: &DeckRef, origin: DeckOrigin) -> DeckNode {
        let mut parent_path = self.parent_path.clone();
        if self.depth > 0 {
            parent_path.push(self.name.clone());
        }
        DeckNode::new(child.id.clone(), child.name.clone(), self.depth + 1, parent_path, origin)
    }

    /// True when an empty child listing may be stored as a leaf
    pub fn may_be_leaf(&self) -> bool {
        self.depth >= MIN_LEAF_DEPTH
    }

    /// Name of the top-level domain this deck belongs to
    pub fn domain_name(&self) -> Option<&str> {
        match self.depth {
            0 => None,
            1 => Some(self.name.as_str()),
            _ => self.parent_path.first().map(String::as_str),
        }
    }

    pub fn to_ref(&self) -> DeckRef {
        DeckRef {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

impl DeckRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl StoredChildren {
    pub fn into_kind(self) -> DeckKind {
        match self {
            StoredChildren::Leaf => DeckKind::Article,
            StoredChildren::Children(children) => DeckKind::Category(children),
        }
    }
}

impl DeckKind {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, DeckKind::Unresolved)
    }

    pub fn children(&self) -> &[DeckRef] {
        match self {
            DeckKind::Category(children) => children,
            _ => &[],
        }
    }
}

const SLUG_NAMESPACE: Uuid = Uuid::from_u128(0x2b8e_51d3_7a0c_4f19_a6d2_0c4e_93b7_18f5);

fn slug_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^\p{L}\p{N}]+").expect("slug pattern is valid"))
}

/// Letters and digits of any script, lowercased, joined by dashes.
/// Names with neither get a short stable hash instead.
fn slugify(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let slug = slug_pattern().replace_all(&lowered, "-");
    let slug = slug.trim_matches('-');
    if !slug.is_empty() {
        return slug.to_string();
    }

    let hash = Uuid::new_v5(&SLUG_NAMESPACE, raw.trim().as_bytes()).simple().to_string();
    format!("t-{}", &hash[..8])
}

/// Namespaced id for a generated child: `parent/slug`.
/// Ids already namespaced under the parent are kept as they are.
pub fn child_id(parent_id: &str, raw: &str) -> String {
    let prefix = format!("{}/", parent_id);
    if raw.starts_with(&prefix) && raw.len() > prefix.len() {
        return raw.to_string();
    }
    format!("{}{}", prefix, slugify(raw))
}

impl std::fmt::Display for DeckOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeckOrigin::Taxonomy => write!(f, "taxonomy"),
            DeckOrigin::Hierarchy => write!(f, "hierarchy"),
            DeckOrigin::Generated => write!(f, "generated"),
        }
    }
}

impl std::str::FromStr for DeckOrigin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "taxonomy" => Ok(DeckOrigin::Taxonomy),
            "hierarchy" => Ok(DeckOrigin::Hierarchy),
            "generated" => Ok(DeckOrigin::Generated),
            other => Err(format!("Invalid deck origin: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_id_is_namespaced_slug() {
        assert_eq!(child_id("biology", "Cell Biology"), "biology/cell-biology");
        assert_eq!(child_id("biology", "  DNA & RNA! "), "biology/dna-rna");
        assert_eq!(child_id("biology", "biology/genetics"), "biology/genetics");
    }

    #[test]
    fn test_child_id_keeps_any_script() {
        assert_eq!(child_id("biology", "分子遗传学"), "biology/分子遗传学");
        assert_eq!(child_id("languages", "Ελληνικά"), "languages/ελληνικά");
        assert_eq!(child_id("languages", "Español básico"), "languages/español-básico");
    }

    #[test]
    fn test_child_id_without_letters_is_hashed() {
        let id = child_id("math", "+++");
        assert!(id.starts_with("math/t-"));
        assert_eq!(id.len(), "math/t-".len() + 8);
        assert_eq!(id, child_id("math", "+++"));
        assert_ne!(id, child_id("math", "***"));
    }

    #[test]
    fn test_child_extends_parent_path() {
        let science = DeckNode::new("science", "Science", 1, vec![], DeckOrigin::Taxonomy);
        let biology = science.child(&DeckRef::new("biology", "Biology"), DeckOrigin::Taxonomy);
        assert_eq!(biology.depth, 2);
        assert_eq!(biology.parent_path, vec!["Science".to_string()]);

        let genetics = biology.child(&DeckRef::new("biology/genetics", "Genetics"), DeckOrigin::Generated);
        assert_eq!(genetics.depth, 3);
        assert_eq!(genetics.parent_path, vec!["Science".to_string(), "Biology".to_string()]);
        assert!(genetics.may_be_leaf());
        assert!(!biology.may_be_leaf());
    }
}
