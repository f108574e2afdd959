//! The vector store contract and the in-process reference implementation.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::MemoryError;
use crate::schema::{MemoryKind, MemoryRecord};

/// Equality filter applied to every similarity query.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryFilter {
    pub user_id: String,
    pub kind: MemoryKind,
}

impl MemoryFilter {
    pub fn recall(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            kind: MemoryKind::Recall,
        }
    }

    pub fn matches(&self, record: &MemoryRecord) -> bool {
        record.user_id == self.user_id && record.kind == self.kind
    }
}

/// One similarity-query hit.
#[derive(Debug, Clone)]
pub struct QueryMatch {
    pub record: MemoryRecord,
    pub score: f32,
}

/// Uniform upsert/fetch/query interface over the vector-capable key-value
/// backend.  All operations are scoped to the implementation's configured
/// namespace.
///
/// Contract notes:
/// * `fetch` on a missing key returns no record for that key — not an error.
/// * `query` returns at most `top_k` matches restricted to `filter`; the
///   ordering of equal-score entries is backend-native and callers must not
///   rely on it.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn upsert(&self, records: &[MemoryRecord]) -> Result<(), MemoryError>;

    async fn fetch(&self, keys: &[String]) -> Result<Vec<MemoryRecord>, MemoryError>;

    async fn query(
        &self,
        vector: &[f32],
        filter: &MemoryFilter,
        top_k: usize,
    ) -> Result<Vec<QueryMatch>, MemoryError>;
}

// ── InMemoryVectorStore ───────────────────────────────────────────────────────

/// Map-backed store with brute-force cosine search.  Used by the test suites
/// and the CLI's offline mode.  Safe for concurrent use; last writer wins at
/// record granularity, matching the remote backend's semantics.
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    records: RwLock<HashMap<String, MemoryRecord>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().unwrap().is_empty()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, records: &[MemoryRecord]) -> Result<(), MemoryError> {
        let mut map = self.records.write().unwrap();
        for record in records {
            map.insert(record.key.clone(), record.clone());
        }
        Ok(())
    }

    async fn fetch(&self, keys: &[String]) -> Result<Vec<MemoryRecord>, MemoryError> {
        let map = self.records.read().unwrap();
        Ok(keys.iter().filter_map(|k| map.get(k).cloned()).collect())
    }

    async fn query(
        &self,
        vector: &[f32],
        filter: &MemoryFilter,
        top_k: usize,
    ) -> Result<Vec<QueryMatch>, MemoryError> {
        let map = self.records.read().unwrap();
        let mut matches: Vec<QueryMatch> = map
            .values()
            .filter(|record| filter.matches(record))
            .map(|record| QueryMatch {
                score: cosine_similarity(vector, &record.embedding),
                record: record.clone(),
            })
            .collect();
        // Score descending, key ascending as a deterministic tie-break so
        // tests are stable.  Callers still must not rely on tie order.
        matches.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.record.key.cmp(&b.record.key))
        });
        matches.truncate(top_k);
        Ok(matches)
    }
}

/// Cosine similarity over the overlapping prefix; 0.0 when either vector has
/// no magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(key: &str, user: &str, kind: MemoryKind, embedding: Vec<f32>) -> MemoryRecord {
        MemoryRecord {
            key: key.to_string(),
            kind,
            user_id: user.to_string(),
            payload: format!("payload for {key}"),
            embedding,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn fetch_missing_key_is_empty_not_error() {
        let store = InMemoryVectorStore::new();
        let out = store.fetch(&["user/u/core".to_string()]).await.unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn upsert_replaces_at_same_key() {
        let store = InMemoryVectorStore::new();
        let mut rec = record("user/u/core", "u", MemoryKind::Core, vec![0.0]);
        store.upsert(std::slice::from_ref(&rec)).await.unwrap();
        rec.payload = "second write".to_string();
        store.upsert(std::slice::from_ref(&rec)).await.unwrap();

        let out = store.fetch(&["user/u/core".to_string()]).await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].payload, "second write");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn query_filters_by_user_and_kind() {
        let store = InMemoryVectorStore::new();
        store
            .upsert(&[
                record("user/a/recall/1", "a", MemoryKind::Recall, vec![1.0, 0.0]),
                record("user/b/recall/1", "b", MemoryKind::Recall, vec![1.0, 0.0]),
                record("user/a/core", "a", MemoryKind::Core, vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let hits = store
            .query(&[1.0, 0.0], &MemoryFilter::recall("a"), 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.key, "user/a/recall/1");
    }

    #[tokio::test]
    async fn query_ranks_by_similarity_and_respects_top_k() {
        let store = InMemoryVectorStore::new();
        store
            .upsert(&[
                record("user/a/recall/far", "a", MemoryKind::Recall, vec![0.0, 1.0]),
                record("user/a/recall/near", "a", MemoryKind::Recall, vec![1.0, 0.1]),
                record("user/a/recall/mid", "a", MemoryKind::Recall, vec![0.7, 0.7]),
            ])
            .await
            .unwrap();

        let hits = store
            .query(&[1.0, 0.0], &MemoryFilter::recall("a"), 2)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].record.key, "user/a/recall/near");
        assert_eq!(hits[1].record.key, "user/a/recall/mid");
    }

    #[test]
    fn cosine_handles_zero_vectors() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
    }
}
