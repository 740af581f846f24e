// src/integrations/topics.rs
//
// Topic-name provider: an outside source of candidate child topic names
// (an encyclopedia lookup, for instance). It may know nothing about a deck.

use async_trait::async_trait;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TopicProvider: Send + Sync {
    /// Candidate child topic names, or None when the provider has nothing
    async fn suggest_child_topics(
        &self,
        deck_name: &str,
        parent_path: &[String],
    ) -> Option<Vec<String>>;
}

/// Provider that never suggests anything, so listings always come from
/// the generation gateway
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTopicProvider;

#[async_trait]
impl TopicProvider for NoTopicProvider {
    async fn suggest_child_topics(
        &self,
        _deck_name: &str,
        _parent_path: &[String],
    ) -> Option<Vec<String>> {
        None
    }
}
