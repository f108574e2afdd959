//! REST client for the remote vector backend.
//!
//! The backend is an opaque key-value + nearest-neighbor service with a
//! JSON-over-HTTP API (`/vectors/upsert`, `/vectors/fetch`, `/query`).
//! Record payloads travel in per-vector metadata so the key scheme and kind
//! tags in [`crate::schema`] survive the round trip.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::debug;

use engram_config::VectorConfig;

use crate::error::MemoryError;
use crate::schema::{MemoryKind, MemoryRecord};
use crate::store::{MemoryFilter, QueryMatch, VectorStore};

/// Process-wide store handle.  Constructing the HTTP client is expensive and
/// the provider rate-limits connection churn, so it is built exactly once.
static SHARED_STORE: OnceLock<Arc<RestVectorStore>> = OnceLock::new();

/// Return the memoized process-wide [`RestVectorStore`], constructing it on
/// first use.  Subsequent calls ignore `config` and return the same handle;
/// the handle is safe for concurrent use by any number of in-flight turns.
pub fn shared_rest_store(config: &VectorConfig) -> Arc<RestVectorStore> {
    SHARED_STORE
        .get_or_init(|| Arc::new(RestVectorStore::new(&config.base_url, &config.namespace)))
        .clone()
}

pub struct RestVectorStore {
    client: reqwest::Client,
    base_url: String,
    namespace: String,
    api_key: Option<String>,
}

impl RestVectorStore {
    /// The API key is read from `ENGRAM_VECTOR_API_KEY`; a keyless backend
    /// (local dev instance) simply gets no auth header.
    pub fn new(base_url: &str, namespace: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            namespace: namespace.to_string(),
            api_key: std::env::var("ENGRAM_VECTOR_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
        }
    }

    async fn post(
        &self,
        path: &str,
        payload: &serde_json::Value,
    ) -> Result<serde_json::Value, MemoryError> {
        let mut req = self.client.post(format!("{}{path}", self.base_url));
        if let Some(ref key) = self.api_key {
            req = req.header("Api-Key", key);
        }
        let response = req
            .json(payload)
            .send()
            .await
            .map_err(|e| MemoryError::Backend(format!("{path}: {e}")))?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| MemoryError::Backend(format!("{path}: non-JSON response: {e}")))?;
        if !status.is_success() {
            return Err(MemoryError::Backend(format!("{path} ({status}): {body}")));
        }
        Ok(body)
    }

    fn record_to_vector(record: &MemoryRecord) -> serde_json::Value {
        json!({
            "id": record.key,
            "values": record.embedding,
            "metadata": {
                "payload": record.payload,
                "kind": record.kind.tag(),
                "user_id": record.user_id,
                "created_at": record.created_at.to_rfc3339(),
            }
        })
    }

    fn vector_to_record(id: &str, value: &serde_json::Value) -> Option<MemoryRecord> {
        let metadata = value.get("metadata")?;
        let kind = match metadata.get("kind").and_then(|k| k.as_str())? {
            "core" => MemoryKind::Core,
            "recall" => MemoryKind::Recall,
            _ => return None,
        };
        let created_at = metadata
            .get("created_at")
            .and_then(|t| t.as_str())
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);
        Some(MemoryRecord {
            key: id.to_string(),
            kind,
            user_id: metadata.get("user_id")?.as_str()?.to_string(),
            payload: metadata.get("payload")?.as_str()?.to_string(),
            embedding: value
                .get("values")
                .and_then(|v| v.as_array())
                .map(|v| {
                    v.iter()
                        .filter_map(|x| x.as_f64())
                        .map(|x| x as f32)
                        .collect()
                })
                .unwrap_or_default(),
            created_at,
        })
    }
}

#[async_trait]
impl VectorStore for RestVectorStore {
    async fn upsert(&self, records: &[MemoryRecord]) -> Result<(), MemoryError> {
        if records.is_empty() {
            return Ok(());
        }
        let payload = json!({
            "namespace": self.namespace,
            "vectors": records.iter().map(Self::record_to_vector).collect::<Vec<_>>(),
        });
        self.post("/vectors/upsert", &payload).await?;
        debug!(count = records.len(), "upserted memory records");
        Ok(())
    }

    async fn fetch(&self, keys: &[String]) -> Result<Vec<MemoryRecord>, MemoryError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let payload = json!({
            "namespace": self.namespace,
            "ids": keys,
        });
        let body = self.post("/vectors/fetch", &payload).await?;

        // Missing keys are simply absent from the response map.
        let mut records = Vec::new();
        if let Some(vectors) = body.get("vectors").and_then(|v| v.as_object()) {
            for key in keys {
                if let Some(value) = vectors.get(key) {
                    if let Some(record) = Self::vector_to_record(key, value) {
                        records.push(record);
                    }
                }
            }
        }
        Ok(records)
    }

    async fn query(
        &self,
        vector: &[f32],
        filter: &MemoryFilter,
        top_k: usize,
    ) -> Result<Vec<QueryMatch>, MemoryError> {
        let payload = json!({
            "namespace": self.namespace,
            "vector": vector,
            "topK": top_k,
            "includeMetadata": true,
            "filter": {
                "user_id": {"$eq": filter.user_id},
                "kind": {"$eq": filter.kind.tag()},
            },
        });
        let body = self.post("/query", &payload).await?;

        let matches = body
            .get("matches")
            .and_then(|m| m.as_array())
            .map(|matches| {
                matches
                    .iter()
                    .filter_map(|m| {
                        let id = m.get("id")?.as_str()?;
                        let score = m.get("score").and_then(|s| s.as_f64()).unwrap_or(0.0) as f32;
                        let record = Self::vector_to_record(id, m)?;
                        Some(QueryMatch { record, score })
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        Ok(matches)
    }
}
