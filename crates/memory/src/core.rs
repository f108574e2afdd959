//! Core memory: one ordered list of durable facts per user.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::MemoryError;
use crate::schema::{MemoryKind, MemoryRecord, core_key};
use crate::store::VectorStore;

/// Shape of the core record's payload blob.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CorePayload {
    memories: Vec<String>,
}

/// Manages the single core memory record per user.
///
/// Writes are full-record read-modify-write: two concurrent writers for the
/// same user can lose an update (last-writer-wins at record granularity).
/// That race is an accepted, documented tradeoff — callers needing stronger
/// guarantees must serialize their own writes.
pub struct CoreMemoryManager {
    store: Arc<dyn VectorStore>,
    /// Width of the zero vector written with core records, so the backend
    /// sees one consistent embedding dimensionality across both kinds.
    embed_dimensions: usize,
}

impl CoreMemoryManager {
    pub fn new(store: Arc<dyn VectorStore>, embed_dimensions: usize) -> Self {
        Self {
            store,
            embed_dimensions,
        }
    }

    /// Read the user's core memories, most recent first.
    ///
    /// A user with no record yet gets `(key, vec![])` — the designed default
    /// for new users, not a fault.
    pub async fn fetch_core_memories(
        &self,
        user_id: &str,
    ) -> Result<(String, Vec<String>), MemoryError> {
        let key = core_key(user_id);
        let records = self.store.fetch(std::slice::from_ref(&key)).await?;
        let memories = match records.into_iter().next() {
            Some(record) => serde_json::from_str::<CorePayload>(&record.payload)?.memories,
            None => Vec::new(),
        };
        Ok((key, memories))
    }

    /// Append (prepend, most-recent-first) or replace a core memory, then
    /// write the whole list back as one record.
    ///
    /// `index` outside `[0, len)` fails with
    /// [`MemoryError::IndexOutOfBounds`] and leaves storage untouched.
    /// Returns a confirmation string surfaced to the reasoning step as the
    /// tool's result.
    pub async fn store_core_memory(
        &self,
        user_id: &str,
        memory: &str,
        index: Option<usize>,
    ) -> Result<String, MemoryError> {
        let (key, mut memories) = self.fetch_core_memories(user_id).await?;

        match index {
            Some(i) => {
                if i >= memories.len() {
                    return Err(MemoryError::IndexOutOfBounds {
                        index: i,
                        len: memories.len(),
                    });
                }
                memories[i] = memory.to_string();
            }
            None => memories.insert(0, memory.to_string()),
        }

        let record = MemoryRecord {
            key,
            kind: MemoryKind::Core,
            user_id: user_id.to_string(),
            payload: serde_json::to_string(&CorePayload { memories })?,
            embedding: vec![0.0; self.embed_dimensions],
            created_at: Utc::now(),
        };
        self.store.upsert(std::slice::from_ref(&record)).await?;
        debug!(user_id, replaced = index.is_some(), "core memory stored");
        Ok("Memory stored.".to_string())
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryVectorStore;

    fn manager() -> (Arc<InMemoryVectorStore>, CoreMemoryManager) {
        let store = Arc::new(InMemoryVectorStore::new());
        let mgr = CoreMemoryManager::new(store.clone(), 8);
        (store, mgr)
    }

    #[tokio::test]
    async fn new_user_gets_empty_list_and_valid_key() {
        let (_, mgr) = manager();
        let (key, memories) = mgr.fetch_core_memories("fresh-user").await.unwrap();
        assert_eq!(key, "user/fresh-user/core");
        assert!(memories.is_empty());
    }

    #[tokio::test]
    async fn store_without_index_prepends() {
        let (_, mgr) = manager();
        mgr.store_core_memory("u", "first fact", None).await.unwrap();
        mgr.store_core_memory("u", "second fact", None).await.unwrap();

        let (_, memories) = mgr.fetch_core_memories("u").await.unwrap();
        assert_eq!(memories, vec!["second fact", "first fact"]);
    }

    #[tokio::test]
    async fn store_at_index_replaces_without_growing() {
        let (_, mgr) = manager();
        mgr.store_core_memory("u", "a", None).await.unwrap();
        mgr.store_core_memory("u", "b", None).await.unwrap();

        mgr.store_core_memory("u", "revised", Some(1)).await.unwrap();
        let (_, memories) = mgr.fetch_core_memories("u").await.unwrap();
        assert_eq!(memories, vec!["b", "revised"]);
    }

    #[tokio::test]
    async fn out_of_bounds_index_errors_and_does_not_mutate() {
        let (_, mgr) = manager();
        mgr.store_core_memory("u", "only", None).await.unwrap();

        let err = mgr.store_core_memory("u", "nope", Some(1)).await.unwrap_err();
        assert!(matches!(err, MemoryError::IndexOutOfBounds { index: 1, len: 1 }));
        assert!(err.is_validation());

        let (_, memories) = mgr.fetch_core_memories("u").await.unwrap();
        assert_eq!(memories, vec!["only"]);
    }

    #[tokio::test]
    async fn index_on_empty_list_errors() {
        let (_, mgr) = manager();
        let err = mgr.store_core_memory("u", "x", Some(0)).await.unwrap_err();
        assert!(matches!(err, MemoryError::IndexOutOfBounds { index: 0, len: 0 }));
    }

    #[tokio::test]
    async fn users_do_not_share_core_records() {
        let (store, mgr) = manager();
        mgr.store_core_memory("alice", "alice fact", None).await.unwrap();
        mgr.store_core_memory("bob", "bob fact", None).await.unwrap();

        let (_, alice) = mgr.fetch_core_memories("alice").await.unwrap();
        assert_eq!(alice, vec!["alice fact"]);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn concurrent_writers_leave_one_intact_record() {
        let (_, mgr) = manager();
        let mgr = Arc::new(mgr);

        let a = {
            let mgr = mgr.clone();
            tokio::spawn(async move { mgr.store_core_memory("u", "from-a", None).await })
        };
        let b = {
            let mgr = mgr.clone();
            tokio::spawn(async move { mgr.store_core_memory("u", "from-b", None).await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        // Last-writer-wins: the surviving record is one of the two writes
        // (or both, if they interleaved cleanly) — never a corrupted blob.
        let (_, memories) = mgr.fetch_core_memories("u").await.unwrap();
        assert!(!memories.is_empty() && memories.len() <= 2);
        for m in &memories {
            assert!(m == "from-a" || m == "from-b");
        }
    }
}
