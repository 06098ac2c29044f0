//! The bounded memory store.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

/// A single memory entry.
///
/// Entries are created by [`MemoryStore::remember`] and never mutated
/// afterwards; the store evicts oldest-first once it exceeds capacity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Unique ID within the store ("mem_<n>", monotonic)
    pub id: String,

    /// Free-form kind tag: "user", "thought", "action", ...
    pub kind: String,

    /// Opaque structured payload
    pub payload: Value,

    /// When this entry was created
    pub created_at: DateTime<Utc>,

    /// Additional key/value metadata
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, Value>,
}

/// Filters for [`MemoryStore::recall`]. All fields optional; an empty query
/// returns everything (up to the store's capacity).
#[derive(Debug, Clone, Default)]
pub struct RecallQuery {
    /// Exact entry ID
    pub id: Option<String>,

    /// Exact kind tag
    pub kind: Option<String>,

    /// Keep only the last `limit` entries of the filtered result
    pub limit: Option<usize>,
}

impl RecallQuery {
    /// Match everything.
    pub fn all() -> Self {
        Self::default()
    }

    /// Match by kind.
    pub fn kind(kind: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            ..Self::default()
        }
    }

    /// The last `limit` entries, any kind.
    pub fn last(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }
}

/// An append-only, capacity-bounded log of typed memory entries.
///
/// `len() <= limit` holds after every mutation. Recall is recency-biased:
/// filters apply first, then the *last* `limit` entries of the filtered
/// result are returned, in insertion order.
pub struct MemoryStore {
    limit: usize,
    next_id: AtomicU64,
    entries: RwLock<Vec<MemoryEntry>>,
}

impl MemoryStore {
    /// Create a store holding at most `limit` entries.
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            next_id: AtomicU64::new(0),
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Append a new entry and return its ID, evicting the oldest entries
    /// if the store is over capacity.
    pub async fn remember(
        &self,
        payload: Value,
        kind: impl Into<String>,
        metadata: serde_json::Map<String, Value>,
    ) -> String {
        let id = format!("mem_{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        let entry = MemoryEntry {
            id: id.clone(),
            kind: kind.into(),
            payload,
            created_at: Utc::now(),
            metadata,
        };

        let mut entries = self.entries.write().await;
        entries.push(entry);
        if entries.len() > self.limit {
            let overflow = entries.len() - self.limit;
            entries.drain(..overflow);
            debug!(evicted = overflow, "memory store trimmed to capacity");
        }
        id
    }

    /// Recall entries matching the query, oldest first.
    pub async fn recall(&self, query: RecallQuery) -> Vec<MemoryEntry> {
        let entries = self.entries.read().await;
        let filtered: Vec<MemoryEntry> = entries
            .iter()
            .filter(|e| query.id.as_ref().is_none_or(|id| &e.id == id))
            .filter(|e| query.kind.as_ref().is_none_or(|kind| &e.kind == kind))
            .cloned()
            .collect();

        match query.limit {
            Some(limit) if filtered.len() > limit => {
                filtered[filtered.len() - limit..].to_vec()
            }
            _ => filtered,
        }
    }

    /// Remove every entry.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Current entry count.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// The configured capacity.
    pub fn limit(&self) -> usize {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn remember_text(store: &MemoryStore, text: &str, kind: &str) -> String {
        store
            .remember(json!(text), kind, serde_json::Map::new())
            .await
    }

    #[tokio::test]
    async fn remember_returns_fresh_ids() {
        let store = MemoryStore::new(10);
        let a = remember_text(&store, "first", "user").await;
        let b = remember_text(&store, "second", "user").await;
        assert_ne!(a, b);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn capacity_is_a_hard_invariant() {
        let store = MemoryStore::new(3);
        for i in 0..10 {
            remember_text(&store, &format!("entry {i}"), "user").await;
            assert!(store.len().await <= 3);
        }

        // The survivors are the most recent, in insertion order.
        let entries = store.recall(RecallQuery::all()).await;
        let texts: Vec<&str> = entries
            .iter()
            .map(|e| e.payload.as_str().unwrap())
            .collect();
        assert_eq!(texts, vec!["entry 7", "entry 8", "entry 9"]);
    }

    #[tokio::test]
    async fn ids_stay_unique_after_eviction() {
        let store = MemoryStore::new(2);
        let mut ids = Vec::new();
        for i in 0..5 {
            ids.push(remember_text(&store, &format!("e{i}"), "user").await);
        }
        let unique: std::collections::HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
    }

    #[tokio::test]
    async fn recall_filters_by_kind() {
        let store = MemoryStore::new(10);
        remember_text(&store, "hello", "user").await;
        remember_text(&store, "I should greet back", "thought").await;
        remember_text(&store, "hi there", "thought").await;

        let thoughts = store.recall(RecallQuery::kind("thought")).await;
        assert_eq!(thoughts.len(), 2);
        assert!(thoughts.iter().all(|e| e.kind == "thought"));
    }

    #[tokio::test]
    async fn recall_filters_by_id() {
        let store = MemoryStore::new(10);
        let id = remember_text(&store, "target", "user").await;
        remember_text(&store, "other", "user").await;

        let found = store
            .recall(RecallQuery {
                id: Some(id.clone()),
                ..RecallQuery::default()
            })
            .await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, id);
    }

    #[tokio::test]
    async fn recall_limit_takes_the_last_entries() {
        let store = MemoryStore::new(10);
        for i in 0..5 {
            remember_text(&store, &format!("e{i}"), "user").await;
        }

        let last_two = store.recall(RecallQuery::last(2)).await;
        assert_eq!(last_two.len(), 2);
        assert_eq!(last_two[0].payload, json!("e3"));
        assert_eq!(last_two[1].payload, json!("e4"));
    }

    #[tokio::test]
    async fn recall_limit_larger_than_store_returns_all() {
        let store = MemoryStore::new(10);
        remember_text(&store, "only", "user").await;
        let entries = store.recall(RecallQuery::last(100)).await;
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn clear_empties_the_store() {
        let store = MemoryStore::new(10);
        remember_text(&store, "a", "user").await;
        remember_text(&store, "b", "user").await;
        store.clear().await;
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn metadata_is_preserved() {
        let store = MemoryStore::new(10);
        let mut meta = serde_json::Map::new();
        meta.insert("step".into(), json!(2));
        store.remember(json!("thinking"), "thought", meta).await;

        let entries = store.recall(RecallQuery::kind("thought")).await;
        assert_eq!(entries[0].metadata.get("step"), Some(&json!(2)));
    }
}
