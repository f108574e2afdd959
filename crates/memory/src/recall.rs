//! Recall memory: timestamped, embedding-indexed facts retrieved by
//! semantic similarity.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use engram_llm::Embedder;

use crate::error::MemoryError;
use crate::schema::{MemoryKind, MemoryRecord, recall_key};
use crate::store::{MemoryFilter, VectorStore};

/// Manages the unbounded per-user set of recall entries.  Entries are
/// write-once: there is no update or delete path, only insert and search.
pub struct RecallMemoryManager {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
}

impl RecallMemoryManager {
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    /// Embed and insert one immutable entry; returns the saved text.
    ///
    /// Not idempotent across retries: every call mints a fresh event id, so
    /// saving the same text twice produces two retrievable entries.
    /// Duplicates degrade search quality gracefully, which is the accepted
    /// tradeoff here.
    pub async fn save_recall_memory(
        &self,
        user_id: &str,
        memory: &str,
    ) -> Result<String, MemoryError> {
        let vector = self
            .embedder
            .embed(memory)
            .await
            .map_err(|e| MemoryError::Embedding(e.to_string()))?;

        let record = MemoryRecord {
            key: recall_key(user_id, &Uuid::new_v4()),
            kind: MemoryKind::Recall,
            user_id: user_id.to_string(),
            payload: memory.to_string(),
            embedding: vector,
            created_at: Utc::now(),
        };
        self.store.upsert(std::slice::from_ref(&record)).await?;
        debug!(user_id, key = %record.key, "recall memory saved");
        Ok(memory.to_string())
    }

    /// Top-k semantic search over the user's recall entries, in the
    /// backend's returned order.  No matches is a valid empty result.
    pub async fn search_memory(
        &self,
        user_id: &str,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<String>, MemoryError> {
        let vector = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| MemoryError::Embedding(e.to_string()))?;

        let matches = self
            .store
            .query(&vector, &MemoryFilter::recall(user_id), top_k)
            .await?;
        Ok(matches.into_iter().map(|m| m.record.payload).collect())
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
