// src/services/deck_resolver.rs
//
// Deck Tree Resolver
//
// CRITICAL RULES:
// - Lookup order: static taxonomy, pre-built hierarchy, store
// - Children are generated at most once at a time per deck
// - A deck shallower than MIN_LEAF_DEPTH is never stored as a leaf: an
//   empty listing is discarded and the deck stays unresolved
// - Leafness deeper down is left to the generator

use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::{
    child_id, ensure_leaf_allowed, validate_children, validate_deck_node, DeckKind, DeckNode,
    DeckOrigin, DeckRef, StaticTaxonomy, StoredChildren, ROOT_DECK_ID,
};
use crate::error::{AppError, AppResult, GenerationError, GenerationResult};
use crate::events::{ChildrenDeferred, ChildrenResolved, EventBus};
use crate::integrations::{
    GenerationGateway, HierarchySource, SubDeckListing, SubDeckRequest, TopicProvider,
};
use crate::repositories::DeckRepository;
use crate::services::task_registry::{Registration, TaskGuard, TaskRegistry};

pub struct DeckResolver {
    taxonomy: Arc<StaticTaxonomy>,
    hierarchy: Option<Arc<dyn HierarchySource>>,
    deck_repo: Arc<dyn DeckRepository>,
    gateway: Arc<dyn GenerationGateway>,
    topics: Arc<dyn TopicProvider>,
    event_bus: Arc<EventBus>,
    tasks: TaskRegistry<String, DeckKind>,
    min_topic_suggestions: usize,
}

impl DeckResolver {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        taxonomy: Arc<StaticTaxonomy>,
        hierarchy: Option<Arc<dyn HierarchySource>>,
        deck_repo: Arc<dyn DeckRepository>,
        gateway: Arc<dyn GenerationGateway>,
        topics: Arc<dyn TopicProvider>,
        event_bus: Arc<EventBus>,
        min_topic_suggestions: usize,
    ) -> Self {
        Self {
            taxonomy,
            hierarchy,
            deck_repo,
            gateway,
            topics,
            event_bus,
            tasks: TaskRegistry::new(),
            min_topic_suggestions,
        }
    }

    /// Find a deck by id
    pub fn resolve(&self, deck_id: &str) -> AppResult<Option<DeckNode>> {
        if let Some(node) = self.taxonomy.node(deck_id) {
            return Ok(Some(node.clone()));
        }
        if let Some(entry) = self.hierarchy.as_ref().and_then(|h| h.lookup(deck_id)) {
            return Ok(Some(entry.node));
        }
        self.deck_repo.get_node(deck_id)
    }

    /// Children already known for a deck, without generating anything
    pub fn known_children(&self, node: &DeckNode) -> AppResult<Option<StoredChildren>> {
        if let Some(children) = self.taxonomy.children(&node.id) {
            return Ok(Some(StoredChildren::Children(children.to_vec())));
        }
        if let Some(children) = self
            .hierarchy
            .as_ref()
            .and_then(|h| h.lookup(&node.id))
            .and_then(|entry| entry.children)
        {
            return Ok(Some(children));
        }
        self.deck_repo.get_children(&node.id)
    }

    /// What is known about a deck's children right now. An unresolved deck
    /// gets its children generated in the background.
    pub fn children_of(self: &Arc<Self>, deck_id: &str) -> AppResult<DeckKind> {
        let node = self.require(deck_id)?;

        if let Some(children) = self.known_children(&node)? {
            return Ok(children.into_kind());
        }

        if self.tasks.is_running(&node.id) {
            return Ok(DeckKind::Unresolved);
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| AppError::Other(format!("No async runtime for background resolution: {}", e)))?;

        let this = Arc::clone(self);
        let id = node.id.clone();
        runtime.spawn(async move {
            if let Err(e) = this.ensure_children(&id).await {
                log::warn!("Background resolution of '{}' failed: {}", id, e);
            }
        });

        Ok(DeckKind::Unresolved)
    }

    /// Resolve a deck's children, generating them if needed. Joins a
    /// resolution already running for the same deck.
    pub async fn ensure_children(self: &Arc<Self>, deck_id: &str) -> AppResult<DeckKind> {
        let node = self.require(deck_id)?;

        let registration = self.tasks.begin_with(node.id.clone(), || {
            Ok(self.known_children(&node)?.map(StoredChildren::into_kind))
        })?;

        let waiter = match registration {
            Registration::Cached(kind) => return Ok(kind),
            Registration::Joined(waiter) => {
                log::debug!("Joining running resolution of '{}'", node.id);
                waiter
            }
            Registration::Started { guard, waiter } => {
                let this = Arc::clone(self);
                tokio::spawn(async move {
                    this.run_resolution(node, guard).await;
                });
                waiter
            }
        };

        Ok(waiter.wait().await?)
    }

    fn require(&self, deck_id: &str) -> AppResult<DeckNode> {
        self.resolve(deck_id)?.ok_or(AppError::NotFound)
    }

    async fn run_resolution(&self, node: DeckNode, guard: TaskGuard<String, DeckKind>) {
        match self.generate_children(&node, &guard).await {
            Ok(kind) => guard.complete(kind),
            Err(e) => {
                log::warn!("Children generation for '{}' failed: {}", node.id, e);
                guard.fail(e);
            }
        }
    }

    async fn generate_children(
        &self,
        node: &DeckNode,
        guard: &TaskGuard<String, DeckKind>,
    ) -> GenerationResult<DeckKind> {
        log::info!("Generating children of '{}' (depth {})", node.id, node.depth);

        let listing = match self.suggested_children(node).await {
            Some(children) => SubDeckListing::Decks(children),
            None => {
                self.gateway
                    .list_sub_decks(SubDeckRequest {
                        deck_name: node.name.clone(),
                        parent_path: node.parent_path.clone(),
                        depth: node.depth,
                        archetype_hint: self.archetype_hint(node),
                    })
                    .await?
            }
        };

        let children = match listing {
            SubDeckListing::Decks(raw) => self.normalize_children(node, raw)?,
            SubDeckListing::Leaf => Vec::new(),
        };

        if !guard.is_current() {
            log::warn!("Ignoring stale children listing for '{}'", node.id);
            return Ok(DeckKind::Unresolved);
        }

        if children.is_empty() {
            if let Err(e) = ensure_leaf_allowed(node) {
                log::warn!("{}; leaving it unresolved", e);
                self.event_bus
                    .emit(ChildrenDeferred::new(node.id.clone(), node.depth));
                return Ok(DeckKind::Unresolved);
            }

            self.deck_repo.set_children(node, &StoredChildren::Leaf, &[])?;
            self.event_bus
                .emit(ChildrenResolved::new(node.id.clone(), 0, true));
            return Ok(DeckKind::Article);
        }

        validate_children(node, &children).map_err(|e| GenerationError::Parse(e.to_string()))?;

        let child_nodes: Vec<DeckNode> = children
            .iter()
            .map(|child| node.child(child, DeckOrigin::Generated))
            .collect();
        for child in &child_nodes {
            validate_deck_node(child).map_err(|e| GenerationError::Parse(e.to_string()))?;
        }

        self.deck_repo.set_children(
            node,
            &StoredChildren::Children(children.clone()),
            &child_nodes,
        )?;

        log::info!("Stored {} children for '{}'", children.len(), node.id);
        self.event_bus
            .emit(ChildrenResolved::new(node.id.clone(), children.len(), false));

        Ok(DeckKind::Category(children))
    }

    /// Child decks from the topic provider, when it offers enough of them
    async fn suggested_children(&self, node: &DeckNode) -> Option<Vec<DeckRef>> {
        let names = self
            .topics
            .suggest_child_topics(&node.name, &node.parent_path)
            .await?;

        let names: Vec<String> = names
            .into_iter()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();

        if names.len() < self.min_topic_suggestions.max(1) {
            log::debug!(
                "Only {} topic suggestions for '{}', asking the generator",
                names.len(),
                node.id
            );
            return None;
        }

        Some(
            names
                .into_iter()
                .map(|name| DeckRef::new(child_id(&node.id, &name), name))
                .collect(),
        )
    }

    /// Namespaced ids, no blanks, no repeated names, no self-reference.
    /// Distinct names whose ids collide ("C", "C++") get a numeric suffix.
    fn normalize_children(
        &self,
        node: &DeckNode,
        raw: Vec<DeckRef>,
    ) -> GenerationResult<Vec<DeckRef>> {
        let offered = raw.len();
        let mut names = HashSet::new();
        let mut ids = HashSet::new();
        let mut children = Vec::new();

        for child in raw {
            let name = child.name.trim();
            if name.is_empty() || !names.insert(name.to_lowercase()) {
                continue;
            }

            let source = if child.id.trim().is_empty() {
                name
            } else {
                child.id.as_str()
            };
            let base = child_id(&node.id, source);
            if base == node.id {
                continue;
            }

            let mut id = base.clone();
            let mut suffix = 2;
            while !ids.insert(id.clone()) {
                id = format!("{}-{}", base, suffix);
                suffix += 1;
            }
            children.push(DeckRef::new(id, name));
        }

        if offered > 0 && children.is_empty() {
            return Err(GenerationError::Parse(format!(
                "none of the {} children offered for '{}' is usable",
                offered, node.id
            )));
        }
        if children.len() < offered {
            log::debug!(
                "Kept {} of {} children offered for '{}'",
                children.len(),
                offered,
                node.id
            );
        }
        Ok(children)
    }

    /// Id of the top-level domain the deck belongs to
    fn archetype_hint(&self, node: &DeckNode) -> Option<String> {
        let domain_name = node.domain_name()?;
        self.taxonomy
            .children(ROOT_DECK_ID)?
            .iter()
            .find(|domain| domain.name == domain_name)
            .map(|domain| domain.id.clone())
    }

    /// Forget running resolutions; their results will not be stored
    pub fn detach_tasks(&self) {
        self.tasks.clear();
    }
}
