use crate::error::{Result, StoreError};
use compass_protocol::NodeType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 64;

/// Reusable wording a team can drop into a statement of the given type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    pub id: String,
    pub node_type: NodeType,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryEvent {
    Added(Snippet),
    Removed(Snippet),
}

/// Shared snippet catalogue with change notifications.
///
/// Independent of the identity store and the engine: writers call
/// [`add`](Self::add) / [`remove`](Self::remove), interested parties
/// [`subscribe`](Self::subscribe). Slow subscribers may observe
/// `RecvError::Lagged` and should re-read with [`list`](Self::list).
#[derive(Debug)]
pub struct SnippetLibrary {
    snippets: RwLock<BTreeMap<NodeType, Vec<Snippet>>>,
    next_id: AtomicU64,
    events: broadcast::Sender<LibraryEvent>,
}

impl Default for SnippetLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl SnippetLibrary {
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            snippets: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            events,
        }
    }

    /// Seed from a JSON array of snippets. Ids are reassigned.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let seeds: Vec<Snippet> = serde_json::from_slice(bytes)?;
        let library = Self::new();
        for seed in seeds {
            library.add(seed.node_type, seed.text)?;
        }
        Ok(library)
    }

    /// Add a snippet. Adding text already present for the type returns the
    /// existing snippet and publishes nothing.
    pub fn add(&self, node_type: NodeType, text: impl Into<String>) -> Result<Snippet> {
        let text = text.into().trim().to_string();
        if text.is_empty() {
            return Err(StoreError::EmptySnippet(node_type));
        }

        let mut snippets = self.snippets.write().unwrap_or_else(PoisonError::into_inner);
        let group = snippets.entry(node_type).or_default();
        if let Some(existing) = group.iter().find(|s| s.text == text) {
            return Ok(existing.clone());
        }
        let snippet = Snippet {
            id: format!("snippet-{}", self.next_id.fetch_add(1, Ordering::SeqCst)),
            node_type,
            text,
        };
        group.push(snippet.clone());
        drop(snippets);

        // No subscribers is not an error.
        let _ = self.events.send(LibraryEvent::Added(snippet.clone()));
        Ok(snippet)
    }

    pub fn remove(&self, id: &str) -> Option<Snippet> {
        let mut snippets = self.snippets.write().unwrap_or_else(PoisonError::into_inner);
        let removed = snippets.values_mut().find_map(|group| {
            let index = group.iter().position(|s| s.id == id)?;
            Some(group.remove(index))
        })?;
        drop(snippets);

        let _ = self.events.send(LibraryEvent::Removed(removed.clone()));
        Some(removed)
    }

    /// Snippets for one node type, in insertion order.
    #[must_use]
    pub fn list(&self, node_type: NodeType) -> Vec<Snippet> {
        self.snippets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&node_type)
            .cloned()
            .unwrap_or_default()
    }

    /// Every snippet, grouped by node type.
    #[must_use]
    pub fn grouped(&self) -> BTreeMap<NodeType, Vec<Snippet>> {
        self.snippets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<LibraryEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn subscribers_see_adds_and_removes() {
        let library = SnippetLibrary::new();
        let mut events = library.subscribe();

        let added = library.add(NodeType::Value, "  Curiosity ").unwrap();
        assert_eq!(added.text, "Curiosity");
        let again = library.add(NodeType::Value, "Curiosity").unwrap();
        assert_eq!(again, added);
        library.add(NodeType::Principle, "Ask why twice").unwrap();

        assert_eq!(events.recv().await.unwrap(), LibraryEvent::Added(added.clone()));
        assert!(matches!(events.recv().await.unwrap(), LibraryEvent::Added(s) if s.node_type == NodeType::Principle));

        assert_eq!(library.remove(&added.id), Some(added.clone()));
        assert_eq!(library.remove(&added.id), None);
        assert_eq!(events.recv().await.unwrap(), LibraryEvent::Removed(added));
        assert!(library.list(NodeType::Value).is_empty());
    }

    #[test]
    fn blank_text_is_rejected() {
        let library = SnippetLibrary::new();
        assert!(matches!(
            library.add(NodeType::Goal, "   "),
            Err(StoreError::EmptySnippet(NodeType::Goal))
        ));
    }

    #[test]
    fn seeds_group_by_node_type() {
        let library = SnippetLibrary::from_json(
            br#"[
                {"id": "x", "node_type": "value", "text": "Candor"},
                {"id": "y", "node_type": "behavior", "text": "Share drafts early"},
                {"id": "z", "node_type": "value", "text": "Ownership"}
            ]"#,
        )
        .unwrap();
        let grouped = library.grouped();
        assert_eq!(grouped.len(), 2);
        let values: Vec<String> = library
            .list(NodeType::Value)
            .into_iter()
            .map(|s| s.text)
            .collect();
        assert_eq!(values, vec!["Candor".to_string(), "Ownership".to_string()]);
        assert_eq!(library.list(NodeType::Value)[0].id, "snippet-1");
    }
}
